#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TableIdentError {
    #[error("table name must not be empty")]
    Empty,
    #[error("table name must not contain NUL characters")]
    Nul,
}

/// A storage table name together with its quoted SQL form.
///
/// Per-stream tables are addressed by interpolating this identifier into
/// query text, so the quoted form is the only representation handed to SQL.
/// Names may contain non-ASCII characters, spaces and parentheses
/// (e.g. `破碎機(220V)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdent {
    name: String,
    quoted: String,
}

impl TableIdent {
    pub fn new(name: impl Into<String>) -> Result<Self, TableIdentError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TableIdentError::Empty);
        }
        if name.contains('\0') {
            return Err(TableIdentError::Nul);
        }

        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push('"');
        for ch in name.chars() {
            if ch == '"' {
                quoted.push('"');
            }
            quoted.push(ch);
        }
        quoted.push('"');

        Ok(Self { name, quoted })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quoted(&self) -> &str {
        &self.quoted
    }
}
