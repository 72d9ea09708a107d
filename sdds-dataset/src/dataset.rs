use std::sync::atomic::{AtomicU64, Ordering};

use sdds_error::{sdds_bail, sdds_err, SddsResult};

use crate::{ArrayDef, ColumnStore, Schema, Value};

/// One array's per-page value: a dimension vector and the elements, stored
/// row-major across dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    dims: Vec<u32>,
    store: ColumnStore,
}

impl ArrayValue {
    /// Build an array value, checking that the element count matches the
    /// dimension product and the store type matches `def`.
    pub fn new(def: &ArrayDef, dims: Vec<u32>, store: ColumnStore) -> SddsResult<Self> {
        if dims.len() != def.dimensions {
            sdds_bail!(
                "array {:?} declares {} dimensions, value has {}",
                def.name,
                def.dimensions,
                dims.len()
            );
        }
        if store.dtype() != def.dtype {
            sdds_bail!(
                "array {:?} is {}, value store is {}",
                def.name,
                def.dtype,
                store.dtype()
            );
        }
        let expected: u64 = dims.iter().map(|&d| u64::from(d)).product();
        if store.len() as u64 != expected {
            sdds_bail!(
                "array {:?} dimensions {:?} imply {} elements, store has {}",
                def.name,
                dims,
                expected,
                store.len()
            );
        }
        Ok(Self { dims, store })
    }

    /// The dimension vector.
    pub fn dims(&self) -> &[u32] {
        &self.dims
    }

    /// The element store.
    pub fn store(&self) -> &ColumnStore {
        &self.store
    }

    /// Total element count.
    pub fn element_count(&self) -> usize {
        self.store.len()
    }
}

/// Per-page mutable storage: parameter values, array values, column stores
/// and row flags. Resets when the next page begins.
#[derive(Debug)]
pub struct PageData {
    n_rows: usize,
    parameters: Vec<Value>,
    arrays: Vec<Option<ArrayValue>>,
    columns: Vec<ColumnStore>,
    row_flags: Vec<bool>,
}

impl PageData {
    fn new(schema: &Schema) -> Self {
        Self {
            n_rows: 0,
            parameters: schema
                .parameters()
                .iter()
                .map(|p| {
                    p.fixed_value
                        .clone()
                        .unwrap_or_else(|| Value::default_for(p.dtype))
                })
                .collect(),
            arrays: vec![None; schema.arrays().len()],
            columns: schema
                .columns()
                .iter()
                .map(|c| ColumnStore::new(c.dtype))
                .collect(),
            row_flags: Vec::new(),
        }
    }

    /// Rows currently held in this page.
    pub fn row_count(&self) -> usize {
        self.n_rows
    }

    /// Set the row count directly. Used by the binary reader, which sizes
    /// column stores itself; `append_row` maintains the count for everyone
    /// else.
    pub fn set_row_count(&mut self, n_rows: usize) {
        self.n_rows = n_rows;
        self.row_flags.resize(n_rows, true);
    }

    /// Parameter values, aligned with the schema's parameter order.
    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    /// Mutable parameter values.
    pub fn parameters_mut(&mut self) -> &mut [Value] {
        &mut self.parameters
    }

    /// Array values, aligned with the schema's array order. `None` is a null
    /// array that serializes as a zero dimension vector.
    pub fn arrays(&self) -> &[Option<ArrayValue>] {
        &self.arrays
    }

    /// Mutable array values.
    pub fn arrays_mut(&mut self) -> &mut [Option<ArrayValue>] {
        &mut self.arrays
    }

    /// Column stores, aligned with the schema's column order.
    pub fn columns(&self) -> &[ColumnStore] {
        &self.columns
    }

    /// Mutable column stores.
    pub fn columns_mut(&mut self) -> &mut [ColumnStore] {
        &mut self.columns
    }

    /// Mutable column stores together with the row flags, for callers that
    /// need to filter rows while mutating storage.
    pub fn columns_and_flags_mut(&mut self) -> (&mut [ColumnStore], &[bool]) {
        (&mut self.columns, &self.row_flags)
    }

    /// Per-row inclusion flags; rows flagged `false` are skipped by
    /// row-major writes.
    pub fn row_flags(&self) -> &[bool] {
        &self.row_flags
    }

    /// Set one row's inclusion flag.
    pub fn set_row_flag(&mut self, row: usize, keep: bool) -> SddsResult<()> {
        let flag = self
            .row_flags
            .get_mut(row)
            .ok_or_else(|| sdds_err!("row {} out of range ({} rows)", row, self.n_rows))?;
        *flag = keep;
        Ok(())
    }

    /// Rows whose inclusion flag is set.
    pub fn rows_of_interest(&self) -> usize {
        self.row_flags.iter().filter(|&&f| f).count()
    }

    /// Truncate the page to `n_rows` rows. Used by auto-recovery.
    pub fn truncate_rows(&mut self, n_rows: usize) {
        for col in &mut self.columns {
            col.truncate(n_rows);
        }
        self.row_flags.truncate(n_rows);
        self.n_rows = self.n_rows.min(n_rows);
    }
}

/// A dataset: a fixed [`Schema`] plus the current page's storage.
///
/// Created once per logical file by the layer that opens it; the binary page
/// codec mutates the page storage in place and never destroys the dataset.
#[derive(Debug)]
pub struct Dataset {
    schema: Schema,
    page: PageData,
    truncations: AtomicU64,
    auto_recovered: bool,
    recovery_required: bool,
}

impl Dataset {
    /// A dataset over `schema`, with an empty first page.
    pub fn new(schema: Schema) -> Self {
        let page = PageData::new(&schema);
        Self {
            schema,
            page,
            truncations: AtomicU64::new(0),
            auto_recovered: false,
            recovery_required: false,
        }
    }

    /// The schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The current page's storage.
    pub fn page(&self) -> &PageData {
        &self.page
    }

    /// Mutable access to the current page's storage.
    pub fn page_mut(&mut self) -> &mut PageData {
        &mut self.page
    }

    /// Split into schema and mutable page borrows, for codec loops that need
    /// both at once.
    pub fn split_mut(&mut self) -> (&Schema, &mut PageData) {
        (&self.schema, &mut self.page)
    }

    /// Begin a fresh page, discarding the previous page's values and
    /// reserving room for `expected_rows`.
    pub fn start_page(&mut self, expected_rows: usize) {
        self.page = PageData::new(&self.schema);
        for col in self.page.columns_mut() {
            col.reserve(expected_rows);
        }
        self.page.row_flags.reserve(expected_rows);
    }

    /// Set a parameter's value for the current page. Fixed parameters cannot
    /// be assigned.
    pub fn set_parameter(&mut self, name: &str, value: Value) -> SddsResult<()> {
        let index = self
            .schema
            .parameter_index(name)
            .ok_or_else(|| sdds_err!("no parameter named {:?}", name))?;
        let def = &self.schema.parameters()[index];
        if def.is_fixed() {
            sdds_bail!("parameter {:?} has a fixed value", name);
        }
        if value.dtype() != def.dtype {
            sdds_bail!(
                "parameter {:?} is {}, got {} value",
                name,
                def.dtype,
                value.dtype()
            );
        }
        self.page.parameters[index] = value;
        Ok(())
    }

    /// A parameter's current value.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.schema
            .parameter_index(name)
            .map(|i| &self.page.parameters[i])
    }

    /// Set an array's value for the current page; `None` stores a null array.
    pub fn set_array(&mut self, name: &str, value: Option<ArrayValue>) -> SddsResult<()> {
        let index = self
            .schema
            .array_index(name)
            .ok_or_else(|| sdds_err!("no array named {:?}", name))?;
        if let Some(v) = &value {
            // Revalidate against the definition; ArrayValue::new may have
            // been built against a different def.
            ArrayValue::new(&self.schema.arrays()[index], v.dims.clone(), v.store.clone())?;
        }
        self.page.arrays[index] = value;
        Ok(())
    }

    /// An array's current value.
    pub fn array(&self, name: &str) -> Option<&ArrayValue> {
        self.schema
            .array_index(name)
            .and_then(|i| self.page.arrays[i].as_ref())
    }

    /// Append one row of column values, in schema order.
    pub fn append_row(&mut self, values: &[Value]) -> SddsResult<()> {
        if values.len() != self.schema.columns().len() {
            sdds_bail!(
                "row has {} values, schema has {} columns",
                values.len(),
                self.schema.columns().len()
            );
        }
        for (col, value) in self.page.columns.iter_mut().zip(values) {
            col.push(value.clone())?;
        }
        self.page.n_rows += 1;
        self.page.row_flags.push(true);
        Ok(())
    }

    /// The value at (`row`, column `name`).
    pub fn cell(&self, row: usize, name: &str) -> Option<Value> {
        self.schema
            .column_index(name)
            .and_then(|i| self.page.columns[i].get(row))
    }

    /// Count one clipped string value.
    pub fn note_truncation(&self) {
        self.truncations.fetch_add(1, Ordering::Relaxed);
    }

    /// Count several clipped string values at once.
    pub fn note_truncations(&self, n: u64) {
        self.truncations.fetch_add(n, Ordering::Relaxed);
    }

    /// Number of string values clipped to the configured field width so far,
    /// across all pages written from this dataset.
    pub fn truncation_count(&self) -> u64 {
        self.truncations.load(Ordering::Relaxed)
    }

    /// Mark the dataset as having auto-recovered from a corrupt page tail.
    /// Subsequent page reads short-circuit to end-of-file.
    pub fn mark_auto_recovered(&mut self) {
        self.auto_recovered = true;
    }

    /// Whether a previous page read auto-recovered.
    pub fn is_auto_recovered(&self) -> bool {
        self.auto_recovered
    }

    /// Mark the dataset as having failed a page decode without recovery.
    /// Retrying a read on it requires recovery-mode handling.
    pub fn mark_recovery_required(&mut self) {
        self.recovery_required = true;
    }

    /// Whether a previous page read failed hard on this dataset.
    pub fn is_recovery_required(&self) -> bool {
        self.recovery_required
    }

    /// Fixed wire width of one binary row, given the configured string field
    /// width: strings cost a 4-byte length prefix plus the fixed payload
    /// width, everything else its scalar width.
    pub fn row_byte_width(&self, string_field_width: usize) -> usize {
        self.schema
            .columns()
            .iter()
            .map(|c| match c.dtype.fixed_size() {
                Some(w) => w,
                None => 4 + string_field_width,
            })
            .sum()
    }
}
