//! Canonical column names and the alias maps that feed the normalizer

/// Canonical student table columns
pub mod student {
    pub const STUDENT_ID: &str = "student_id";
    pub const NAME: &str = "name";
    pub const COLLEGE: &str = "college";
    pub const MAJOR: &str = "major";
    pub const ADMINISTRATIVE_CLASS: &str = "administrative_class";
    pub const BOOK_ISBN: &str = "book_isbn";

    /// Canonical fields in report order
    pub const ALL: [&str; 6] = [
        STUDENT_ID,
        NAME,
        COLLEGE,
        MAJOR,
        ADMINISTRATIVE_CLASS,
        BOOK_ISBN,
    ];
}

/// Canonical book table columns
pub mod book {
    pub const ISBN: &str = "isbn";
    /// Target label of the resolved price column
    pub const DISCOUNTED_PRICE: &str = "discounted_price";

    pub const ALL: [&str; 1] = [ISBN];
}

/// Ordered mapping from canonical field to the source labels accepted for it.
///
/// Every field in the map is required. A field's own canonical name is always
/// accepted in addition to its aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    fields: Vec<(String, Vec<String>)>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, or replace the aliases of an existing one
    pub fn with_field<S: Into<String>>(mut self, canonical: &str, aliases: Vec<S>) -> Self {
        self.set_aliases(canonical, aliases.into_iter().map(Into::into).collect());
        self
    }

    pub fn set_aliases(&mut self, canonical: &str, aliases: Vec<String>) {
        match self.fields.iter_mut().find(|(name, _)| name == canonical) {
            Some((_, existing)) => *existing = aliases,
            None => self.fields.push((canonical.to_string(), aliases)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields
            .iter()
            .map(|(name, aliases)| (name.as_str(), aliases.as_slice()))
    }

    pub fn canonical_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == canonical)
    }

    /// Default aliases for roster exports
    pub fn default_student() -> Self {
        Self::new()
            .with_field(student::STUDENT_ID, vec!["学号", "Student ID"])
            .with_field(student::NAME, vec!["姓名", "Name"])
            .with_field(student::COLLEGE, vec!["学院", "College"])
            .with_field(student::MAJOR, vec!["专业", "Major"])
            .with_field(student::ADMINISTRATIVE_CLASS, vec!["行政班", "班级", "Class"])
            .with_field(student::BOOK_ISBN, vec!["ISBN", "书号"])
    }

    /// Default aliases for book price lists
    pub fn default_book() -> Self {
        Self::new().with_field(book::ISBN, vec!["ISBN", "书号"])
    }
}
