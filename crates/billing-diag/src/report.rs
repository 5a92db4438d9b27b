//! Console Reports
//!
//! Every diagnostic builds a [`Report`] first and prints it once, so the
//! builders can be tested without capturing stdout.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warn,
    Fail,
}

impl Status {
    pub const fn icon(&self) -> &'static str {
        match self {
            Self::Ok => "✅",
            Self::Warn => "⚠️ ",
            Self::Fail => "❌",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Check {
    pub label: String,
    pub status: Status,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    Check(Check),
    Line(String),
}

#[derive(Clone, Debug, Default)]
pub struct Section {
    pub heading: String,
    pub entries: Vec<Entry>,
}

impl Section {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            entries: Vec::new(),
        }
    }

    pub fn check(&mut self, label: impl Into<String>, status: Status, detail: impl Into<String>) {
        self.entries.push(Entry::Check(Check {
            label: label.into(),
            status,
            detail: detail.into(),
        }));
    }

    pub fn ok(&mut self, label: impl Into<String>, detail: impl Into<String>) {
        self.check(label, Status::Ok, detail);
    }

    pub fn warn(&mut self, label: impl Into<String>, detail: impl Into<String>) {
        self.check(label, Status::Warn, detail);
    }

    pub fn fail(&mut self, label: impl Into<String>, detail: impl Into<String>) {
        self.check(label, Status::Fail, detail);
    }

    pub fn line(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::Line(text.into()));
    }

    pub fn checks(&self) -> impl Iterator<Item = &Check> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Check(c) => Some(c),
            Entry::Line(_) => None,
        })
    }

    /// First check with this label
    pub fn find(&self, label: &str) -> Option<&Check> {
        self.checks().find(|c| c.label == label)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Report {
    pub title: String,
    pub sections: Vec<Section>,

    /// A vendor call failed at transport level or answered non-2xx
    api_failed: bool,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            sections: Vec::new(),
            api_failed: false,
        }
    }

    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn mark_api_failure(&mut self) {
        self.api_failed = true;
    }

    pub const fn api_failed(&self) -> bool {
        self.api_failed
    }

    pub fn count(&self, status: Status) -> usize {
        self.sections
            .iter()
            .flat_map(Section::checks)
            .filter(|c| c.status == status)
            .count()
    }

    pub fn section(&self, heading: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.heading == heading)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🔍 {}", self.title)?;

        for section in &self.sections {
            writeln!(f)?;
            writeln!(f, "📊 {}:", section.heading)?;
            for entry in &section.entries {
                match entry {
                    Entry::Check(c) if c.detail.is_empty() => {
                        writeln!(f, "   {} {}", c.status.icon(), c.label)?;
                    }
                    Entry::Check(c) => {
                        writeln!(f, "   {} {}: {}", c.status.icon(), c.label, c.detail)?;
                    }
                    Entry::Line(text) => writeln!(f, "   {text}")?,
                }
            }
        }

        let (fails, warns) = (self.count(Status::Fail), self.count(Status::Warn));
        writeln!(f)?;
        if fails == 0 && warns == 0 {
            writeln!(f, "🎯 All checks passed")
        } else {
            writeln!(f, "🎯 {fails} problem(s), {warns} warning(s)")
        }
    }
}
