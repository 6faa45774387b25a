//! Declarative record schemas.
//!
//! Every record type lists its fields once, in output order, as a static
//! table of [`FieldDesc`] entries. Each entry says whether the field is a
//! numeric leaf, a textual leaf, a nested record, or a repeated collection
//! of records, and how to reach it. Walking a record means walking its
//! table; there is no runtime type inspection.

/// How to reach one field of `T` and what kind of field it is.
pub enum FieldKind<T> {
    Numeric(fn(&T) -> f64),
    Textual(fn(&T) -> &str),
    Nested(fn(&T) -> &dyn Record),
    Repeated(fn(&T) -> Vec<&dyn Record>),
}

/// One entry of a record's field table.
pub struct FieldDesc<T> {
    /// Series name component for numeric leaves.
    pub name: &'static str,
    pub kind: FieldKind<T>,
}

impl<T> FieldDesc<T> {
    pub const fn numeric(name: &'static str, get: fn(&T) -> f64) -> Self {
        Self {
            name,
            kind: FieldKind::Numeric(get),
        }
    }

    pub const fn textual(name: &'static str, get: fn(&T) -> &str) -> Self {
        Self {
            name,
            kind: FieldKind::Textual(get),
        }
    }

    pub const fn nested(name: &'static str, get: fn(&T) -> &dyn Record) -> Self {
        Self {
            name,
            kind: FieldKind::Nested(get),
        }
    }

    pub const fn repeated(name: &'static str, get: fn(&T) -> Vec<&dyn Record>) -> Self {
        Self {
            name,
            kind: FieldKind::Repeated(get),
        }
    }
}

/// A label contributed by an element of a repeated collection.
pub struct Identity<T> {
    pub label: &'static str,
    pub value: fn(&T) -> &str,
}

/// Static description of a record type.
pub trait Schema: Sized + 'static {
    /// Series name component used when this record is nested or repeated.
    const TYPE_NAME: &'static str;

    /// Fields in output order.
    const FIELDS: &'static [FieldDesc<Self>];

    /// Labels identifying one element when the record sits in a collection.
    const IDENTITY: &'static [Identity<Self>] = &[];
}

/// Receives the fields of a record during a walk.
pub trait Visitor {
    fn numeric(&mut self, name: &'static str, value: f64);

    fn textual(&mut self, _name: &'static str, _value: &str) {}

    fn nested(&mut self, record: &dyn Record);

    fn repeated(&mut self, items: Vec<&dyn Record>);
}

/// Object-safe view of a [`Schema`] value.
pub trait Record {
    fn type_name(&self) -> &'static str;

    /// Feed every field to `visitor`, in declared order.
    fn visit(&self, visitor: &mut dyn Visitor);

    /// `(label, value)` pairs identifying this element.
    fn identity(&self) -> Vec<(&'static str, &str)>;
}

impl<T: Schema> Record for T {
    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn visit(&self, visitor: &mut dyn Visitor) {
        for field in T::FIELDS {
            match &field.kind {
                FieldKind::Numeric(get) => visitor.numeric(field.name, get(self)),
                FieldKind::Textual(get) => visitor.textual(field.name, get(self)),
                FieldKind::Nested(get) => visitor.nested(get(self)),
                FieldKind::Repeated(get) => visitor.repeated(get(self)),
            }
        }
    }

    fn identity(&self) -> Vec<(&'static str, &str)> {
        T::IDENTITY
            .iter()
            .map(|id| (id.label, (id.value)(self)))
            .collect()
    }
}
