//! Step 3: Encoding cleanup.
//!
//! Worksheets travel through spreadsheet tools that introduce smart
//! punctuation and occasionally save in a legacy single-byte encoding.
//! This step re-decodes the exported CSV and normalizes it so the
//! downstream tagging step sees clean UTF-8.

use std::fs;

use crate::orchestrator::errors::StepError;
use crate::orchestrator::step::StepProcessor;
use crate::orchestrator::types::{
    BatchState, Context, EncodingOutput, StepResult, ValidationResult,
};

use super::{atomic_write, ensure_step_dir, CSV_FILE};

/// Step 3: normalize the exported CSV to clean UTF-8.
pub struct EncodingStep;

impl EncodingStep {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EncodingStep {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode CSV bytes as UTF-8, falling back to Latin-1.
///
/// Latin-1 maps every byte to the Unicode scalar of the same value, so
/// the fallback never fails. Returns the text and the number of
/// non-ASCII bytes that were re-decoded.
fn decode_bytes(bytes: &[u8]) -> (String, usize) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), 0),
        Err(_) => {
            let non_ascii = bytes.iter().filter(|b| !b.is_ascii()).count();
            (bytes.iter().map(|&b| b as char).collect(), non_ascii)
        }
    }
}

/// Replace smart punctuation and invisible characters.
///
/// Returns the cleaned text and the number of characters replaced.
fn normalize_text(text: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut replaced = 0;
    for c in text.chars() {
        match c {
            // Byte order mark, stripped entirely
            '\u{feff}' => replaced += 1,
            '\u{2018}' | '\u{2019}' => {
                out.push('\'');
                replaced += 1;
            }
            '\u{201c}' | '\u{201d}' => {
                out.push('"');
                replaced += 1;
            }
            '\u{2013}' | '\u{2014}' => {
                out.push('-');
                replaced += 1;
            }
            '\u{2026}' => {
                out.push_str("...");
                replaced += 1;
            }
            '\u{00a0}' => {
                out.push(' ');
                replaced += 1;
            }
            _ => out.push(c),
        }
    }
    (out, replaced)
}

impl StepProcessor for EncodingStep {
    fn number(&self) -> u32 {
        3
    }

    fn name(&self) -> &str {
        "Encoding cleanup"
    }

    fn description(&self) -> &str {
        "Normalize the exported CSV to clean UTF-8"
    }

    fn validate_inputs(&self, ctx: &Context) -> ValidationResult {
        let path = ctx.paths.step_dir(2).join(CSV_FILE);
        if !path.is_file() {
            return ValidationResult::error(format!(
                "Exported CSV not found: {}",
                path.display()
            ));
        }
        ValidationResult::ok()
    }

    fn execute(&self, ctx: &Context, state: &mut BatchState) -> Result<StepResult, StepError> {
        let input = ctx.paths.step_dir(2).join(CSV_FILE);
        if !input.is_file() {
            return Err(StepError::file_not_found(input.display().to_string()));
        }

        let bytes = fs::read(&input)
            .map_err(|e| StepError::io_error(format!("read {}", input.display()), e))?;

        let (text, redecoded) = decode_bytes(&bytes);
        if redecoded > 0 {
            ctx.logger.warn(&format!(
                "CSV was not valid UTF-8, re-decoded {} bytes as Latin-1",
                redecoded
            ));
        }
        let (cleaned, replaced) = normalize_text(&text);

        let dir = ensure_step_dir(ctx, self.number())?;
        let path = dir.join(CSV_FILE);
        atomic_write(&path, cleaned.as_bytes())?;

        let replacements = redecoded + replaced;
        ctx.logger.info(&format!(
            "Cleaned CSV written to {} ({} replacements)",
            path.display(),
            replacements
        ));

        state.encoding = Some(EncodingOutput { path, replacements });
        Ok(StepResult::ok(format!(
            "Cleaned CSV with {} replacements",
            replacements
        )))
    }

    fn validate_outputs(&self, _ctx: &Context, state: &BatchState) -> ValidationResult {
        match &state.encoding {
            Some(out) if out.path.is_file() => ValidationResult::ok(),
            Some(out) => {
                ValidationResult::error(format!("Cleaned CSV missing: {}", out.path.display()))
            }
            None => ValidationResult::error("Encoding output not recorded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::steps::testing;
    use tempfile::tempdir;

    fn seed_csv(ctx: &Context, bytes: &[u8]) {
        let dir = ctx.paths.step_dir(2);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(CSV_FILE), bytes).unwrap();
    }

    #[test]
    fn normalizes_smart_punctuation() {
        let input = "\u{feff}filename,title\nscan.tif,\u{201c}Main\u{00a0}quad\u{201d} \u{2014} north\u{2026}\n";
        let (cleaned, replaced) = normalize_text(input);
        assert_eq!(
            cleaned,
            "filename,title\nscan.tif,\"Main quad\" - north...\n"
        );
        assert_eq!(replaced, 6);
    }

    #[test]
    fn latin1_fallback_recovers_text() {
        let (text, redecoded) = decode_bytes(b"caf\xe9");
        assert_eq!(text, "caf\u{e9}");
        assert_eq!(redecoded, 1);

        let (text, redecoded) = decode_bytes("already utf-8 \u{e9}".as_bytes());
        assert_eq!(text, "already utf-8 \u{e9}");
        assert_eq!(redecoded, 0);
    }

    #[test]
    fn writes_cleaned_copy_and_counts() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(&dir);
        seed_csv(&ctx, "filename,title\nscan.tif,\u{2018}quad\u{2019}\n".as_bytes());

        let step = EncodingStep::new();
        assert!(step.validate_inputs(&ctx).is_valid());

        let mut state = BatchState::new("t");
        let result = step.execute(&ctx, &mut state).unwrap();
        assert!(result.success);

        let out = state.encoding.as_ref().unwrap();
        assert_eq!(out.replacements, 2);
        let content = fs::read_to_string(&out.path).unwrap();
        assert_eq!(content, "filename,title\nscan.tif,'quad'\n");
        assert!(step.validate_outputs(&ctx, &state).is_valid());
    }

    #[test]
    fn clean_input_passes_through_unchanged() {
        let dir = tempdir().unwrap();
        let ctx = testing::context(&dir);
        seed_csv(&ctx, b"filename,title\nscan.tif,plain\n");

        let mut state = BatchState::new("t");
        EncodingStep::new().execute(&ctx, &mut state).unwrap();

        let out = state.encoding.unwrap();
        assert_eq!(out.replacements, 0);
        assert_eq!(
            fs::read_to_string(&out.path).unwrap(),
            "filename,title\nscan.tif,plain\n"
        );
    }
}
