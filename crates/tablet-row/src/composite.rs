use crate::error::RowCodecError;
use crate::schema::Schema;
use crate::view::RowView;

/// An ordered sequence of row pointers, each decoded against its own
/// schema. Used when a projection spans joined sources: component `k`'s
/// bytes and schema are independent of every other component's.
pub struct CompositeRow<'a> {
    parts: Vec<(&'a Schema, &'a [u8])>,
}

impl<'a> CompositeRow<'a> {
    pub fn new(parts: Vec<(&'a Schema, &'a [u8])>) -> Result<Self, RowCodecError> {
        if parts.is_empty() {
            return Err(RowCodecError::EmptyComposite);
        }
        Ok(Self { parts })
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn view(&self, component: usize) -> Result<RowView<'a>, RowCodecError> {
        let (schema, buf) = self
            .parts
            .get(component)
            .ok_or(RowCodecError::ComponentOutOfRange(component))?;
        RowView::new(schema, buf)
    }

    pub fn get_row_string(&self) -> Result<String, RowCodecError> {
        let mut parts = Vec::with_capacity(self.parts.len());
        for i in 0..self.parts.len() {
            parts.push(self.view(i)?.get_row_string());
        }
        Ok(parts.join(", "))
    }
}
