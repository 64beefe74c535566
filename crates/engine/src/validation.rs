//! Structural validation of generated text.
//!
//! Turns the raw response back into typed per-speaker sections using the
//! same line-anchored pattern the format instructions quote, and parses the
//! optional trailing output-parameter list by its sentinel.

use std::collections::HashMap;

use regex_lite::Regex;

use skywave_domain::{ContentError, OUTPUT_PARAMS_SEPARATOR, SECTION_PATTERN};

/// A response that survived validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidatedResponse {
    pub speaker_names: Vec<String>,
    pub speech_texts: Vec<String>,
    pub output_params: HashMap<String, String>,
}

/// Validate the raw generated text against the expected section count.
///
/// Rejects blank input and input without a single `label: "speech"` line.
/// Sections beyond `expected_sections` are dropped, not an error. A present
/// but malformed output-parameter list fails the whole call.
pub fn validate_response(
    raw: &str,
    expected_sections: usize,
) -> Result<ValidatedResponse, ContentError> {
    if raw.trim().is_empty() {
        return Err(ContentError::Validation("response is empty".to_string()));
    }

    let pattern = Regex::new(&format!("(?m){SECTION_PATTERN}"))
        .map_err(|e| ContentError::Validation(format!("section pattern failed to build: {e}")))?;

    let mut speaker_names = Vec::new();
    let mut speech_texts = Vec::new();
    for captures in pattern.captures_iter(raw) {
        if speech_texts.len() >= expected_sections {
            break;
        }
        // Group 1 is the speaker label, group 2 the quoted single-line text.
        let (Some(name), Some(text)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        speaker_names.push(name.as_str().to_string());
        speech_texts.push(text.as_str().to_string());
    }

    if speech_texts.is_empty() {
        return Err(ContentError::Validation(format!(
            "no speaker sections found in: {raw}"
        )));
    }

    let output_params = parse_output_params(raw)?;

    Ok(ValidatedResponse {
        speaker_names,
        speech_texts,
        output_params,
    })
}

/// Parse the trailing `key: value` list when the sentinel occurs exactly
/// once. A pair without a separator is a validation error rather than a
/// silent skip.
fn parse_output_params(raw: &str) -> Result<HashMap<String, String>, ContentError> {
    let parts: Vec<&str> = raw.split(OUTPUT_PARAMS_SEPARATOR).collect();
    if parts.len() != 2 {
        return Ok(HashMap::new());
    }

    let mut params = HashMap::new();
    for pair in parts[1].split(',') {
        let (key, value) = pair.split_once(':').ok_or_else(|| {
            ContentError::Validation(format!("malformed output parameter: {pair}"))
        })?;
        params.insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(params)
}
