use std::collections::BTreeMap;

use crate::spec::field::Field;

/// Flattened id → field lookup over a field collection.
///
/// Built once per render pass and shared by every visibility check in that
/// pass. Section children are indexed alongside their parents, so a condition
/// can target a nested field whether the caller walks the tree or a flat list.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex<'a> {
    entries: BTreeMap<&'a str, &'a Field>,
}

impl<'a> FieldIndex<'a> {
    /// Indexes every field and, recursively, every section child. A later
    /// field with an already indexed id replaces the earlier one.
    pub fn build(fields: &'a [Field]) -> Self {
        let mut index = Self::default();
        index.extend(fields);
        index
    }

    fn extend(&mut self, fields: &'a [Field]) {
        for field in fields {
            self.entries.insert(field.id.as_str(), field);
            if !field.fields.is_empty() {
                self.extend(&field.fields);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&'a Field> {
        self.entries.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.keys().copied()
    }
}

/// Free-function form of [`FieldIndex::build`].
pub fn build_index(fields: &[Field]) -> FieldIndex<'_> {
    FieldIndex::build(fields)
}

/// Where a visibility check resolves its targets from: either the raw field
/// collection (indexed on the fly) or an index the caller already built.
#[derive(Debug, Clone, Copy)]
pub enum FieldSource<'i, 'a> {
    Fields(&'a [Field]),
    Index(&'i FieldIndex<'a>),
}

impl<'a> From<&'a [Field]> for FieldSource<'_, 'a> {
    fn from(fields: &'a [Field]) -> Self {
        FieldSource::Fields(fields)
    }
}

impl<'a> From<&'a Vec<Field>> for FieldSource<'_, 'a> {
    fn from(fields: &'a Vec<Field>) -> Self {
        FieldSource::Fields(fields.as_slice())
    }
}

impl<'i, 'a> From<&'i FieldIndex<'a>> for FieldSource<'i, 'a> {
    fn from(index: &'i FieldIndex<'a>) -> Self {
        FieldSource::Index(index)
    }
}
