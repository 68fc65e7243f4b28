
use std::net::SocketAddr;
use std::process::{Child, Command, Stdio};

use futures_util::SinkExt;
use tokio_tungstenite::tungstenite::Message;

use support_stack::{connect, free_port, message_type, next_json, run_async_test};

struct ServerProcess {
    child: Child,
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        drop(self.child.kill());
        drop(self.child.wait());
    }
}

fn spawn_loadwire(args: &[String]) -> Result<ServerProcess, String> {
    let child = Command::new(env!("CARGO_BIN_EXE_loadwire"))
        .args(args)
        .env_remove("LOADWIRE_CAPTCHA_SECRET")
        .env("LOADWIRE_LOG", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| format!("Failed to spawn loadwire: {}", err))?;
    Ok(ServerProcess { child })
}

#[test]
fn e2e_binary_serves_channel_and_targets() -> Result<(), String> {
    let channel_port = free_port()?;
    let targets_port = free_port()?;
    let targets = format!("127.0.0.1:{}", targets_port);
    let _server = spawn_loadwire(&[
        "--listen".to_owned(),
        format!("127.0.0.1:{}", channel_port),
        "--serve-targets".to_owned(),
        "--targets-listen".to_owned(),
        targets.clone(),
        "--target-base-url".to_owned(),
        format!("http://{}", targets),
        "--captcha-secret".to_owned(),
        "binary-secret".to_owned(),
    ])?;

    run_async_test(async move {
        let addr: SocketAddr = format!("127.0.0.1:{}", channel_port)
            .parse()
            .map_err(|err| format!("Invalid address: {}", err))?;
        let mut socket = connect(addr).await?;
        socket
            .send(Message::Text(
                r#"{"page":"nocaptcha","rps":50,"max":3}"#.to_owned(),
            ))
            .await
            .map_err(|err| err.to_string())?;

        for _ in 0..3 {
            let message = next_json(&mut socket).await?;
            let status = message
                .pointer("/result/statusCode")
                .and_then(serde_json::Value::as_u64);
            if message_type(&message) != Some("result") || status != Some(200) {
                return Err(format!("Unexpected result {}", message));
            }
        }
        let done = next_json(&mut socket).await?;
        if message_type(&done) != Some("done") {
            return Err(format!("Expected done, got {}", done));
        }
        Ok(())
    })
}

#[test]
fn e2e_binary_rejects_invalid_target_url() -> Result<(), String> {
    let output = Command::new(env!("CARGO_BIN_EXE_loadwire"))
        .args(["--listen", "127.0.0.1:0", "--target-base-url", "ftp://nowhere"])
        .env("LOADWIRE_LOG", "off")
        .output()
        .map_err(|err| format!("Failed to run loadwire: {}", err))?;
    if output.status.success() {
        return Err("Expected non-zero exit for invalid target URL".to_owned());
    }
    Ok(())
}
