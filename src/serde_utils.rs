// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! Some utilities for the quirkier corners of the input dataset.

use serde::{Deserialize, Deserializer};

/// Yellow-pages coordinates arrive either as JSON numbers or as their
/// string form.
pub fn de_f64_from_string_or_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(value) => Ok(value),
        NumberOrString::String(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(deserialize_with = "de_f64_from_string_or_number")]
        value: f64,
    }

    #[test]
    fn accepts_numbers_and_strings() {
        let from_number: Wrapper = serde_json::from_str(r#"{"value": 55.5}"#).unwrap();
        assert_relative_eq!(55.5, from_number.value);
        let from_string: Wrapper = serde_json::from_str(r#"{"value": "55.5"}"#).unwrap();
        assert_relative_eq!(55.5, from_string.value);
        assert!(serde_json::from_str::<Wrapper>(r#"{"value": "not a number"}"#).is_err());
    }
}
