//! Tag delimiters.
//!
//! A delimiter pair is one or two characters to open a tag and one or two
//! characters to close it. The default pair is `{{ }}`; templates may switch
//! pairs mid-stream with a `{{=<% %>=}}` directive.

use std::fmt;

use stache_rs_core::{StacheError, StacheResult};

/// The open and close delimiters for tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delims {
    pub start1: char,
    pub start2: Option<char>,
    pub end1: char,
    pub end2: Option<char>,
}

impl Default for Delims {
    fn default() -> Self {
        Self {
            start1: '{',
            start2: Some('{'),
            end1: '}',
            end2: Some('}'),
        }
    }
}

impl Delims {
    /// Parses a delimiter specification such as `"<% %>"` or `"[ ]"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use stache_rs_template::delims::Delims;
    ///
    /// let delims = Delims::parse("<% %>").unwrap();
    /// assert_eq!(delims.start(), "<%");
    /// assert_eq!(delims.end(), "%>");
    /// assert!(Delims::parse("<%%>").is_err());
    /// ```
    pub fn parse(spec: &str) -> StacheResult<Self> {
        let mut delims = Self::default();
        delims.update_delims(spec)?;
        Ok(delims)
    }

    /// Replaces the delimiters from a specification of exactly two
    /// whitespace-separated tokens, each one or two characters long.
    ///
    /// On error the delimiters are left unchanged.
    pub fn update_delims(&mut self, spec: &str) -> StacheResult<()> {
        let tokens: Vec<&str> = spec.split_whitespace().collect();
        let [start, end] = tokens.as_slice() else {
            return Err(invalid_delims(spec));
        };
        let (start1, start2) = split_delim(start).ok_or_else(|| invalid_delims(spec))?;
        let (end1, end2) = split_delim(end).ok_or_else(|| invalid_delims(spec))?;
        *self = Self {
            start1,
            start2,
            end1,
            end2,
        };
        Ok(())
    }

    /// Returns a copy of the current delimiters for a later [`restore`](Self::restore).
    pub const fn save(&self) -> Self {
        *self
    }

    /// Resets the delimiters to a previously saved pair.
    pub fn restore(&mut self, saved: Self) {
        *self = saved;
    }

    /// Returns `true` when the delimiters are the default `{{ }}`.
    ///
    /// Triple-mustache `{{{name}}}` tags are only recognized in this case.
    pub fn is_staches(&self) -> bool {
        *self == Self::default()
    }

    /// The opening delimiter as a string.
    pub fn start(&self) -> String {
        self.start2.map_or_else(
            || self.start1.to_string(),
            |c| [self.start1, c].iter().collect(),
        )
    }

    /// The closing delimiter as a string.
    pub fn end(&self) -> String {
        self.end2.map_or_else(
            || self.end1.to_string(),
            |c| [self.end1, c].iter().collect(),
        )
    }
}

impl fmt::Display for Delims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.start(), self.end())
    }
}

fn split_delim(token: &str) -> Option<(char, Option<char>)> {
    let mut chars = token.chars();
    let first = chars.next()?;
    let second = chars.next();
    if chars.next().is_some() {
        return None;
    }
    Some((first, second))
}

fn invalid_delims(spec: &str) -> StacheError {
    StacheError::ConfigurationError(format!(
        "Invalid delimiter configuration '{spec}'. Must be of the form {{{{=1 2=}}}} or {{{{=12 34=}}}} \
         where 1, 2, 3 and 4 are delimiter chars."
    ))
}
