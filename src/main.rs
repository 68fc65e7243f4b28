use loadwire::error::AppResult;

fn main() -> AppResult<()> {
    loadwire::run()
}
