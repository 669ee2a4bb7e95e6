#![forbid(unsafe_code)]

//! Minibuffer reads.
//!
//! A read is a modal frame whose input delegate is a [`MinibufferState`]: a
//! prompt, a line editor, a submit function that validates the text, and an
//! optional completion function. Submitting valid text finishes the frame
//! with [`Signal::Result`](crate::signal::Signal::Result); invalid text shows
//! the validator's message and keeps the read open.

use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use crate::input::{LineInput, common_prefix};

/// Validates submitted text. `Err` carries the message shown to the user.
pub type SubmitFn = Rc<dyn Fn(&str) -> Result<String, String>>;

/// Lists completion candidates for the current text.
pub type CompleteFn = Rc<dyn Fn(&str) -> Vec<String>>;

/// The state of one active minibuffer read.
#[derive(Clone)]
pub struct MinibufferState {
    prompt: String,
    input: LineInput,
    submit: SubmitFn,
    complete: Option<CompleteFn>,
}

impl fmt::Debug for MinibufferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinibufferState")
            .field("prompt", &self.prompt)
            .field("text", &self.input.text())
            .field("completes", &self.complete.is_some())
            .finish()
    }
}

/// Outcome of a completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Nothing matches.
    NoMatch,
    /// The text was extended (or replaced by the single match).
    Extended,
    /// Several candidates share no longer prefix; they are listed.
    Ambiguous(Vec<String>),
    /// This read has no completion function.
    Unsupported,
}

impl MinibufferState {
    pub fn new(prompt: impl Into<String>, submit: SubmitFn) -> Self {
        Self {
            prompt: prompt.into(),
            input: LineInput::new(),
            submit,
            complete: None,
        }
    }

    /// Accept any text unchanged.
    pub fn accept_any(prompt: impl Into<String>) -> Self {
        Self::new(prompt, Rc::new(|text: &str| Ok::<_, String>(text.to_string())))
    }

    #[must_use]
    pub fn with_default(mut self, text: &str) -> Self {
        self.input.set_text(text);
        self
    }

    #[must_use]
    pub fn with_completion(mut self, complete: CompleteFn) -> Self {
        self.complete = Some(complete);
        self
    }

    #[must_use]
    pub fn with_history(mut self, history: Vec<String>) -> Self {
        self.input = self.input.with_history(history);
        self
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn text(&self) -> &str {
        self.input.text()
    }

    pub fn input(&self) -> &LineInput {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut LineInput {
        &mut self.input
    }

    /// Validate the current text. On success the text is recorded in history.
    pub fn submit(&mut self) -> Result<String, String> {
        let value = (self.submit)(self.input.text())?;
        self.input.submit();
        Ok(value)
    }

    /// Complete the text to the longest common prefix of the candidates.
    pub fn complete(&mut self) -> Completion {
        let Some(complete) = self.complete.clone() else {
            return Completion::Unsupported;
        };
        let candidates = complete(self.input.text());
        match candidates.as_slice() {
            [] => Completion::NoMatch,
            [only] => {
                self.input.set_text(only.clone());
                Completion::Extended
            }
            many => {
                let prefix = common_prefix(many.iter().map(String::as_str));
                if prefix.chars().count() > self.input.text().chars().count() {
                    self.input.set_text(prefix);
                    Completion::Extended
                } else {
                    Completion::Ambiguous(many.to_vec())
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Validators and completers
// ---------------------------------------------------------------------------

/// Accepts text that parses as an `i64`.
pub fn integer_validator() -> SubmitFn {
    Rc::new(|text: &str| match text.trim().parse::<i64>() {
        Ok(value) => Ok(value.to_string()),
        Err(_) => Err("Please enter an integer.".to_string()),
    })
}

/// Accepts y, yes, n, no (any case) and normalizes to `true`/`false`.
pub fn bool_validator() -> SubmitFn {
    Rc::new(|text: &str| match text.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok("true".to_string()),
        "n" | "no" => Ok("false".to_string()),
        _ => Err("Please answer y or n.".to_string()),
    })
}

/// Completes paths against the filesystem. Directories get a trailing `/`.
pub fn file_completer() -> CompleteFn {
    Rc::new(|text: &str| complete_path(text))
}

/// Candidates for a partially typed path, sorted.
pub fn complete_path(text: &str) -> Vec<String> {
    let (dir, stem) = match text.rfind('/') {
        Some(slash) => (&text[..=slash], &text[slash + 1..]),
        None => ("", text),
    };
    let listing = if dir.is_empty() { Path::new(".") } else { Path::new(dir) };
    let Ok(entries) = fs::read_dir(listing) else {
        return Vec::new();
    };
    let mut candidates: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            if !name.starts_with(stem) || (stem.is_empty() && name.starts_with('.')) {
                return None;
            }
            let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());
            Some(format!("{dir}{name}{}", if is_dir { "/" } else { "" }))
        })
        .collect();
    candidates.sort();
    candidates
}
