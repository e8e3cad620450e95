use derive_new::new;
use serde::{Deserialize, Deserializer, Serialize};

/// A scripture passage and its citation.
///
/// `content` is the verse body without surrounding quotation marks, `reference` a short citation such as `John 3:16`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, new)]
pub struct Quote {
	#[new(into)]
	pub reference: String,
	#[new(into)]
	pub content: String,
}

impl<'de> Deserialize<'de> for Quote {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
	where
		D: Deserializer<'de>, {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum QuoteHelper {
			Pair(String, String),
			Structured { reference: String, content: String },
		}

		let helper = QuoteHelper::deserialize(deserializer)?;
		Ok(match helper {
			QuoteHelper::Pair(reference, content) => Quote { reference, content },
			QuoteHelper::Structured { reference, content } => Quote { reference, content },
		})
	}
}

const QUOTE_MARKS: &[char] = &['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}', '\u{00AB}', '\u{00BB}'];

impl Quote {
	/// Copy with surrounding quotation marks stripped and runs of whitespace collapsed.
	///
	/// Scripture providers are inconsistent here; the compositor adds its own marks and expects none in `content`.
	pub fn cleaned(&self) -> Self {
		let content = self.content.split_whitespace().collect::<Vec<_>>().join(" ");
		let content = content.trim_matches(|c: char| QUOTE_MARKS.contains(&c) || c.is_whitespace()).to_owned();
		let reference = self.reference.split_whitespace().collect::<Vec<_>>().join(" ");
		Quote { reference, content }
	}

	/// Citation line as drawn under the quote.
	pub fn attribution(&self) -> String {
		format!("\u{2014} {}", self.reference)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn deserializes_table_and_pair_forms() {
		let table: Quote = serde_json::from_str(r#"{"reference":"Psalm 23:1","content":"The Lord is my shepherd"}"#).unwrap();
		let pair: Quote = serde_json::from_str(r#"["Psalm 23:1","The Lord is my shepherd"]"#).unwrap();
		assert_eq!(table, pair);
		assert_eq!(table.reference, "Psalm 23:1");
	}

	#[test]
	fn cleaned_strips_marks_and_whitespace() {
		let q = Quote::new("  John 11:35 ", "\u{201C}Jesus   wept.\u{201D}\n");
		let c = q.cleaned();
		assert_eq!(c.content, "Jesus wept.");
		assert_eq!(c.reference, "John 11:35");
		// input untouched
		assert_eq!(q.content, "\u{201C}Jesus   wept.\u{201D}\n");
	}

	#[test]
	fn attribution_prefixes_dash() {
		assert_eq!(Quote::new("John 3:16", "").attribution(), "\u{2014} John 3:16");
	}
}
