use serde::{Deserialize, Serialize};

/// Write behaviour for `put` and `put_stream`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PutOptions {
    /// Reuse the desired key even if an object already lives there.
    pub overwrite: bool,
    /// Remove the partially written file when a streamed put fails.
    pub remove_partial: bool,
}

impl PutOptions {
    pub fn overwrite() -> Self {
        Self {
            overwrite: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_false() {
        let opts: PutOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, PutOptions::default());

        let opts: PutOptions = serde_json::from_str(r#"{"overwrite":true}"#).unwrap();
        assert!(opts.overwrite);
        assert!(!opts.remove_partial);
    }
}
