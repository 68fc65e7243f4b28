use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::http::RandomSource;

const CHALLENGE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";
const CHALLENGE_LEN: usize = 6;
const NOISE_LINES: usize = 3;
const WIDTH: usize = 150;
const HEIGHT: usize = 50;
const PALETTE: [&str; 6] = ["#1f77b4", "#d62728", "#2ca02c", "#9467bd", "#8c564b", "#e377c2"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captcha {
    pub text: String,
    pub svg: String,
    pub hash: String,
}

/// Issues challenges whose answer is only recoverable through `sha256(secret + text)`.
#[derive(Clone)]
pub struct CaptchaIssuer {
    secret: String,
    random: Arc<dyn RandomSource>,
}

impl std::fmt::Debug for CaptchaIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptchaIssuer")
            .field("random", &self.random)
            .finish_non_exhaustive()
    }
}

impl CaptchaIssuer {
    #[must_use]
    pub fn new(secret: impl Into<String>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            secret: secret.into(),
            random,
        }
    }

    #[must_use]
    pub fn issue(&self) -> Captcha {
        let text: String = (0..CHALLENGE_LEN)
            .filter_map(|_| self.pick(CHALLENGE_ALPHABET).copied().map(char::from))
            .collect();
        let svg = self.render_svg(&text);
        let hash = self.hash_for(&text);
        Captcha { text, svg, hash }
    }

    #[must_use]
    pub fn hash_for(&self, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    #[must_use]
    pub fn verify(&self, text: &str, hash: &str) -> bool {
        self.hash_for(text) == hash
    }

    fn pick<'item, T>(&self, items: &'item [T]) -> Option<&'item T> {
        items.get(self.random.next_index(items.len()))
    }

    fn between(&self, low: usize, high: usize) -> usize {
        let span = high.saturating_sub(low).saturating_add(1);
        low.saturating_add(self.random.next_index(span))
    }

    fn render_svg(&self, text: &str) -> String {
        let mut parts = vec![format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" viewBox=\"0,0,{WIDTH},{HEIGHT}\">"
        )];
        for _ in 0..NOISE_LINES {
            let color = self.pick(&PALETTE).copied().unwrap_or("#444");
            parts.push(format!(
                "<path d=\"M{} {} C{} {},{} {},{} {}\" stroke=\"{}\" fill=\"none\"/>",
                self.between(0, 20),
                self.between(5, HEIGHT.saturating_sub(5)),
                self.between(30, 70),
                self.between(0, HEIGHT),
                self.between(80, 120),
                self.between(0, HEIGHT),
                self.between(WIDTH.saturating_sub(20), WIDTH),
                self.between(5, HEIGHT.saturating_sub(5)),
                color
            ));
        }
        let slot = WIDTH.checked_div(text.len().saturating_add(1)).unwrap_or(WIDTH);
        let mut x = slot;
        for ch in text.chars() {
            let color = self.pick(&PALETTE).copied().unwrap_or("#444");
            let y = self.between(30, 40);
            let angle = i64::try_from(self.between(0, 40))
                .unwrap_or(0)
                .saturating_sub(20);
            parts.push(format!(
                "<text x=\"{x}\" y=\"{y}\" font-size=\"{}\" font-family=\"monospace\" fill=\"{color}\" transform=\"rotate({angle} {x} {y})\">{ch}</text>",
                self.between(24, 32)
            ));
            x = x.saturating_add(slot);
        }
        parts.push("</svg>".to_owned());
        parts.concat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::SeededRandom;

    fn issuer(secret: &str) -> CaptchaIssuer {
        CaptchaIssuer::new(secret, Arc::new(SeededRandom::new(7)))
    }

    #[test]
    fn issued_hash_verifies_against_text() -> Result<(), String> {
        let issuer = issuer("MOGADISHU");
        let captcha = issuer.issue();
        if captcha.text.len() != CHALLENGE_LEN {
            return Err(format!("Unexpected challenge {}", captcha.text));
        }
        if !issuer.verify(&captcha.text, &captcha.hash) {
            return Err("Expected issued hash to verify".to_owned());
        }
        if issuer.verify("wrong1", &captcha.hash) {
            return Err("Expected other text to fail".to_owned());
        }
        Ok(())
    }

    #[test]
    fn hash_is_sha256_of_secret_and_text() -> Result<(), String> {
        // sha256("abc")
        let hash = issuer("a").hash_for("bc");
        if hash != "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad" {
            return Err(format!("Unexpected hash {}", hash));
        }
        Ok(())
    }

    #[test]
    fn secret_changes_hash() -> Result<(), String> {
        if issuer("one").hash_for("abc123") == issuer("two").hash_for("abc123") {
            return Err("Expected distinct hashes for distinct secrets".to_owned());
        }
        Ok(())
    }

    #[test]
    fn svg_renders_every_character() -> Result<(), String> {
        let captcha = issuer("secret").issue();
        if !captcha.svg.starts_with("<svg") || !captcha.svg.ends_with("</svg>") {
            return Err("Expected svg document".to_owned());
        }
        let glyphs = captcha.svg.matches("<text ").count();
        if glyphs != CHALLENGE_LEN {
            return Err(format!("Expected {} glyphs, got {}", CHALLENGE_LEN, glyphs));
        }
        if captcha.svg.matches("<path ").count() != NOISE_LINES {
            return Err("Expected noise lines".to_owned());
        }
        Ok(())
    }
}
