use itertools::Itertools;
use sdds_dtype::SddsType;
use sdds_error::{sdds_bail, SddsResult};

use crate::Value;

/// Definition of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name, unique among columns.
    pub name: String,
    /// Element type.
    pub dtype: SddsType,
    /// Optional display field width from the header; unrelated to the binary
    /// string field width, which is a page-I/O configuration value.
    pub field_length: Option<u32>,
    /// Optional units, carried in the header only.
    pub units: Option<String>,
}

impl ColumnDef {
    /// A new column definition.
    pub fn new(name: impl Into<String>, dtype: SddsType) -> Self {
        Self {
            name: name.into(),
            dtype,
            field_length: None,
            units: None,
        }
    }

    /// Attach units.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Attach a display field length.
    pub fn with_field_length(mut self, field_length: u32) -> Self {
        self.field_length = Some(field_length);
        self
    }
}

/// Definition of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    /// Parameter name, unique among parameters.
    pub name: String,
    /// Value type.
    pub dtype: SddsType,
    /// A fixed literal value. Fixed parameters live only in the header and
    /// are never read or written in binary pages.
    pub fixed_value: Option<Value>,
    /// Optional units, carried in the header only.
    pub units: Option<String>,
}

impl ParameterDef {
    /// A new parameter definition.
    pub fn new(name: impl Into<String>, dtype: SddsType) -> Self {
        Self {
            name: name.into(),
            dtype,
            fixed_value: None,
            units: None,
        }
    }

    /// Make this a fixed parameter with the given literal value.
    pub fn with_fixed_value(mut self, value: Value) -> Self {
        self.fixed_value = Some(value);
        self
    }

    /// Attach units.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    /// Whether this parameter participates in binary page titles.
    pub fn is_fixed(&self) -> bool {
        self.fixed_value.is_some()
    }
}

/// Definition of one array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDef {
    /// Array name, unique among arrays.
    pub name: String,
    /// Element type.
    pub dtype: SddsType,
    /// Declared dimensionality, at least 1. A page may still hold a null
    /// value for the array; its title entry is then a zero dimension vector
    /// of this length.
    pub dimensions: usize,
    /// Optional units, carried in the header only.
    pub units: Option<String>,
}

impl ArrayDef {
    /// A new array definition.
    pub fn new(name: impl Into<String>, dtype: SddsType, dimensions: usize) -> Self {
        Self {
            name: name.into(),
            dtype,
            dimensions,
            units: None,
        }
    }

    /// Attach units.
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}

/// The ordered column, parameter and array definitions of a dataset.
///
/// Definition order is wire order: binary titles and rows serialize fields in
/// exactly the order they appear here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    columns: Vec<ColumnDef>,
    parameters: Vec<ParameterDef>,
    arrays: Vec<ArrayDef>,
}

impl Schema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column definition.
    pub fn add_column(&mut self, def: ColumnDef) -> SddsResult<usize> {
        if self.columns.iter().any(|c| c.name == def.name) {
            sdds_bail!("duplicate column name {:?}", def.name);
        }
        self.columns.push(def);
        Ok(self.columns.len() - 1)
    }

    /// Append a parameter definition.
    pub fn add_parameter(&mut self, def: ParameterDef) -> SddsResult<usize> {
        if self.parameters.iter().any(|p| p.name == def.name) {
            sdds_bail!("duplicate parameter name {:?}", def.name);
        }
        if let Some(fixed) = &def.fixed_value {
            if fixed.dtype() != def.dtype {
                sdds_bail!(
                    "fixed value for parameter {:?} has type {} but the parameter is {}",
                    def.name,
                    fixed.dtype(),
                    def.dtype
                );
            }
        }
        self.parameters.push(def);
        Ok(self.parameters.len() - 1)
    }

    /// Append an array definition.
    pub fn add_array(&mut self, def: ArrayDef) -> SddsResult<usize> {
        if def.dimensions == 0 {
            sdds_bail!("array {:?} must have at least one dimension", def.name);
        }
        if self.arrays.iter().any(|a| a.name == def.name) {
            sdds_bail!("duplicate array name {:?}", def.name);
        }
        self.arrays.push(def);
        Ok(self.arrays.len() - 1)
    }

    /// The column definitions, in wire order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// The parameter definitions, in wire order.
    pub fn parameters(&self) -> &[ParameterDef] {
        &self.parameters
    }

    /// The array definitions, in wire order.
    pub fn arrays(&self) -> &[ArrayDef] {
        &self.arrays
    }

    /// Index of the column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Index of the parameter named `name`.
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    /// Index of the array named `name`.
    pub fn array_index(&self, name: &str) -> Option<usize> {
        self.arrays.iter().position(|a| a.name == name)
    }

    /// Whether any column is string-typed. Column-major and collective row
    /// transfers reject such schemas.
    pub fn has_string_column(&self) -> bool {
        self.columns.iter().any(|c| c.dtype == SddsType::String)
    }

    /// A short human-readable summary, used in error context.
    pub fn summary(&self) -> String {
        format!(
            "{} columns [{}], {} parameters, {} arrays",
            self.columns.len(),
            self.columns.iter().map(|c| c.name.as_str()).join(", "),
            self.parameters.len(),
            self.arrays.len()
        )
    }
}
