use std::borrow::Cow;

use crate::driver::{Escape, escape_list};
use crate::scan::{positional_marker_offsets, substitute_named};
use crate::types::RowValues;

/// Values bound into a statement template.
///
/// Positional binds fill marker characters left to right, named binds fill
/// `:name` tokens. Insertion order is kept for both.
#[derive(Debug, Clone, PartialEq)]
pub enum Binds {
    Positional(Vec<RowValues>),
    Named(Vec<(String, RowValues)>),
}

impl Default for Binds {
    fn default() -> Self {
        Binds::Positional(Vec::new())
    }
}

impl Binds {
    /// Named binds from `(name, value)` pairs.
    pub fn named<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RowValues>,
    {
        Binds::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Binds::Positional(values) => values.len(),
            Binds::Named(pairs) => pairs.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(key, value)` view; positional binds are keyed by their index.
    fn keyed(&self) -> Vec<(Cow<'_, str>, &RowValues)> {
        match self {
            Binds::Positional(values) => values
                .iter()
                .enumerate()
                .map(|(i, v)| (Cow::Owned(i.to_string()), v))
                .collect(),
            Binds::Named(pairs) => pairs
                .iter()
                .map(|(k, v)| (Cow::Borrowed(k.as_str()), v))
                .collect(),
        }
    }

    fn values(&self) -> Vec<&RowValues> {
        match self {
            Binds::Positional(values) => values.iter().collect(),
            Binds::Named(pairs) => pairs.iter().map(|(_, v)| v).collect(),
        }
    }
}

impl From<Vec<RowValues>> for Binds {
    fn from(values: Vec<RowValues>) -> Self {
        Binds::Positional(values)
    }
}

impl<const N: usize> From<[RowValues; N]> for Binds {
    fn from(values: [RowValues; N]) -> Self {
        Binds::Positional(values.into())
    }
}

impl From<&[RowValues]> for Binds {
    fn from(values: &[RowValues]) -> Self {
        Binds::Positional(values.to_vec())
    }
}

impl From<Vec<(String, RowValues)>> for Binds {
    fn from(pairs: Vec<(String, RowValues)>) -> Self {
        Binds::Named(pairs)
    }
}

impl<const N: usize> From<[(&str, RowValues); N]> for Binds {
    fn from(pairs: [(&str, RowValues); N]) -> Self {
        Binds::named(pairs)
    }
}

/// Which substitution strategy a template gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BindMode {
    Named,
    Positional,
}

impl BindMode {
    /// Any literal `:` in the template selects named mode.
    pub(crate) fn detect(template: &str) -> Self {
        if template.contains(':') {
            BindMode::Named
        } else {
            BindMode::Positional
        }
    }
}

/// Substitute `binds` into `template`. Never fails: when nothing applies, or the
/// positional marker count does not match the bind count, the template comes
/// back unchanged.
pub(crate) fn compile<'a>(
    template: &'a str,
    binds: &Binds,
    marker: Option<char>,
    escaper: &dyn Escape,
) -> Cow<'a, str> {
    let Some(marker) = marker else {
        return Cow::Borrowed(template);
    };
    if binds.is_empty() || (!template.contains(marker) && !template.contains(':')) {
        return Cow::Borrowed(template);
    }

    match BindMode::detect(template) {
        BindMode::Named => compile_named(template, binds, escaper),
        BindMode::Positional => compile_positional(template, binds, marker, escaper),
    }
}

fn compile_named<'a>(template: &'a str, binds: &Binds, escaper: &dyn Escape) -> Cow<'a, str> {
    let quote = escaper.escape_character();
    let mut keyed = binds.keyed();

    // a key that is a prefix of a later key must lose to it
    if keyed.iter().all(|(key, _)| key.parse::<usize>().is_err()) {
        keyed.reverse();
    }

    let candidates: Vec<(String, String)> = keyed
        .into_iter()
        .map(|(key, value)| {
            let replacement = match value {
                RowValues::List(items) => escape_list(escaper, items),
                scalar => strip_quotes(&escaper.escape(scalar), quote).to_string(),
            };
            (key.into_owned(), replacement)
        })
        .collect();

    substitute_named(template, &candidates)
}

fn compile_positional<'a>(
    template: &'a str,
    binds: &Binds,
    marker: char,
    escaper: &dyn Escape,
) -> Cow<'a, str> {
    let offsets = positional_marker_offsets(template, marker);
    let values = binds.values();
    if offsets.len() != values.len() {
        tracing::warn!(
            markers = offsets.len(),
            binds = values.len(),
            "bind count does not match marker count; statement left uncompiled"
        );
        return Cow::Borrowed(template);
    }

    let mut sql = template.to_string();
    let width = marker.len_utf8();
    // last to first keeps earlier offsets valid
    for (offset, value) in offsets.iter().zip(values).rev() {
        let escaped = match value {
            RowValues::List(items) => escape_list(escaper, items),
            scalar => escaper.escape(scalar),
        };
        sql.replace_range(*offset..*offset + width, &escaped);
    }
    Cow::Owned(sql)
}

/// Remove one quote character from each edge, when present.
fn strip_quotes(escaped: &str, quote: char) -> &str {
    let inner = escaped.strip_prefix(quote).unwrap_or(escaped);
    inner.strip_suffix(quote).unwrap_or(inner)
}
