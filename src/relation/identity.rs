//! Identity enum for representing single and composite column references
//!
//! Primary keys may consist of one or more columns. `Identity` keeps them in
//! declaration order.

/// Represents a column identifier that can be single or composite
///
/// - Single column keys (`Unary`)
/// - Two column composite keys (`Binary`)
/// - Three column composite keys (`Ternary`)
/// - Four or more column composite keys (`Many`)
///
/// # Example
///
/// ```
/// use tidepool::relation::Identity;
///
/// let id = Identity::from("id");
/// assert_eq!(id.arity(), 1);
///
/// let composite = Identity::from(vec!["tenant_id", "id"]);
/// assert_eq!(composite.iter().collect::<Vec<_>>(), vec!["tenant_id", "id"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Single column identifier
    Unary(String),
    /// Two column identifiers (composite key)
    Binary(String, String),
    /// Three column identifiers (composite key)
    Ternary(String, String, String),
    /// Four or more column identifiers (composite key)
    Many(Vec<String>),
}

impl Identity {
    /// Get the arity (number of columns) for this identity
    pub fn arity(&self) -> usize {
        match self {
            Self::Unary(_) => 1,
            Self::Binary(_, _) => 2,
            Self::Ternary(_, _, _) => 3,
            Self::Many(vec) => vec.len(),
        }
    }

    /// Iterate over column names in declaration order
    pub fn iter(&self) -> BorrowedIdentityIter<'_> {
        BorrowedIdentityIter {
            identity: self,
            index: 0,
        }
    }

    /// The column name when this identity has exactly one column
    pub fn unary(&self) -> Option<&str> {
        match self {
            Self::Unary(col) => Some(col),
            Self::Many(vec) if vec.len() == 1 => Some(&vec[0]),
            _ => None,
        }
    }

    /// Check if this identity contains a specific column
    pub fn contains(&self, col: &str) -> bool {
        self.iter().any(|c| c == col)
    }
}

/// Iterator over the column names of an `Identity`
#[derive(Debug)]
pub struct BorrowedIdentityIter<'a> {
    identity: &'a Identity,
    index: usize,
}

impl<'a> Iterator for BorrowedIdentityIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match self.identity {
            Identity::Unary(col) => (self.index == 0).then_some(col.as_str()),
            Identity::Binary(a, b) => match self.index {
                0 => Some(a.as_str()),
                1 => Some(b.as_str()),
                _ => None,
            },
            Identity::Ternary(a, b, c) => match self.index {
                0 => Some(a.as_str()),
                1 => Some(b.as_str()),
                2 => Some(c.as_str()),
                _ => None,
            },
            Identity::Many(vec) => vec.get(self.index).map(String::as_str),
        };
        if result.is_some() {
            self.index += 1;
        }
        result
    }
}

impl From<&str> for Identity {
    fn from(col: &str) -> Self {
        Self::Unary(col.to_string())
    }
}

impl From<String> for Identity {
    fn from(col: String) -> Self {
        Self::Unary(col)
    }
}

impl From<Vec<String>> for Identity {
    fn from(mut cols: Vec<String>) -> Self {
        match cols.len() {
            1 => Self::Unary(cols.remove(0)),
            2 => {
                let b = cols.remove(1);
                Self::Binary(cols.remove(0), b)
            }
            3 => {
                let c = cols.remove(2);
                let b = cols.remove(1);
                Self::Ternary(cols.remove(0), b, c)
            }
            _ => Self::Many(cols),
        }
    }
}

impl From<Vec<&str>> for Identity {
    fn from(cols: Vec<&str>) -> Self {
        cols.into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
            .into()
    }
}
