#![allow(clippy::cast_possible_truncation)]
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use rstest::rstest;
use sdds_comm::{Collective, SharedFile, SoloComm, ThreadComm};
use sdds_dataset::{
    ArrayDef, ArrayValue, ColumnDef, ColumnStore, Dataset, ParameterDef, Schema, Value,
};
use sdds_dtype::SddsType;
use sdds_error::SddsError;

use crate::channel::{ReadChannel, WriteChannel};
use crate::{
    assign_rows, row, title, title_byte_len, ByteOrder, PageIoOptions, PageStatus, RowCountMode,
    SddsReader, SddsWriter,
};

fn foreign_order() -> ByteOrder {
    match ByteOrder::native() {
        ByteOrder::LittleEndian => ByteOrder::BigEndian,
        ByteOrder::BigEndian => ByteOrder::LittleEndian,
    }
}

fn numeric_schema() -> Schema {
    let mut schema = Schema::new();
    schema.add_column(ColumnDef::new("a", SddsType::Double)).unwrap();
    schema.add_column(ColumnDef::new("b", SddsType::Long)).unwrap();
    schema
}

fn beam_schema() -> Schema {
    let mut schema = Schema::new();
    schema
        .add_parameter(ParameterDef::new("step", SddsType::Long))
        .unwrap();
    schema
        .add_parameter(ParameterDef::new("comment", SddsType::String))
        .unwrap();
    schema
        .add_parameter(
            ParameterDef::new("species", SddsType::String)
                .with_fixed_value(Value::String("e-".into())),
        )
        .unwrap();
    schema
        .add_array(ArrayDef::new("profile", SddsType::Double, 2))
        .unwrap();
    schema.add_array(ArrayDef::new("tags", SddsType::String, 1)).unwrap();
    schema
        .add_column(ColumnDef::new("x", SddsType::Double).with_units("m"))
        .unwrap();
    schema.add_column(ColumnDef::new("idx", SddsType::Long)).unwrap();
    schema.add_column(ColumnDef::new("name", SddsType::String)).unwrap();
    schema
}

fn numeric_row(global: u64) -> Vec<Value> {
    vec![
        Value::Double(global as f64 * 0.5),
        Value::Long(global as i32 - 3),
    ]
}

fn fill_numeric(dataset: &mut Dataset, rows: std::ops::Range<u64>) {
    for r in rows {
        dataset.append_row(&numeric_row(r)).unwrap();
    }
}

fn run_workers<T: Send + 'static>(
    size: usize,
    f: impl Fn(ThreadComm) -> T + Send + Sync + 'static,
) -> Vec<T> {
    let f = Arc::new(f);
    let comms = ThreadComm::world(size).unwrap();
    let handles: Vec<_> = comms
        .into_iter()
        .map(|comm| {
            let f = Arc::clone(&f);
            thread::spawn(move || f(comm))
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn round_trip_single_worker() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("beam.sdds");
    let options = PageIoOptions::default().with_string_field_width(8);

    let mut dataset = Dataset::new(beam_schema());
    dataset.set_parameter("step", Value::Long(7)).unwrap();
    dataset
        .set_parameter("comment", Value::String("first page".into()))
        .unwrap();
    let profile = ArrayValue::new(
        &dataset.schema().arrays()[0].clone(),
        vec![2, 3],
        ColumnStore::Double(vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5]),
    )
    .unwrap();
    dataset.set_array("profile", Some(profile)).unwrap();
    let tags = ArrayValue::new(
        &dataset.schema().arrays()[1].clone(),
        vec![2],
        ColumnStore::String(vec!["hot".into(), String::new()]),
    )
    .unwrap();
    dataset.set_array("tags", Some(tags)).unwrap();
    for (i, name) in ["short", "way too long", "", "exactly8"].iter().enumerate() {
        dataset
            .append_row(&[
                Value::Double(i as f64),
                Value::Long(i as i32),
                Value::String((*name).into()),
            ])
            .unwrap();
    }

    let mut writer =
        SddsWriter::create(&path, SoloComm, &dataset, options.clone(), Some("run 12")).unwrap();
    writer.write_page(&mut dataset).unwrap();
    // Only "way too long" exceeds the 8-byte field.
    assert_eq!(dataset.truncation_count(), 1);

    // Second page: no rows, null arrays, new parameter values.
    dataset.start_page(0);
    dataset.set_parameter("step", Value::Long(8)).unwrap();
    writer.write_page(&mut dataset).unwrap();
    writer.close().unwrap();

    let mut reader = SddsReader::open(&path, SoloComm, options).unwrap();
    assert_eq!(reader.header().schema, *dataset.schema());
    assert_eq!(reader.header().description.as_deref(), Some("run 12"));

    let mut back = reader.dataset();
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
    assert_eq!(back.page().row_count(), 4);
    assert_eq!(back.parameter("step"), Some(&Value::Long(7)));
    assert_eq!(
        back.parameter("comment"),
        Some(&Value::String("first page".into()))
    );
    // Fixed parameters come from the header, never the wire.
    assert_eq!(back.parameter("species"), Some(&Value::String("e-".into())));
    let profile = back.array("profile").unwrap();
    assert_eq!(profile.dims(), &[2, 3]);
    assert_eq!(
        profile.store().as_double().unwrap(),
        &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5]
    );
    let tags = back.array("tags").unwrap();
    assert_eq!(
        tags.store(),
        &ColumnStore::String(vec!["hot".into(), String::new()])
    );
    assert_eq!(back.cell(0, "name"), Some(Value::String("short".into())));
    assert_eq!(back.cell(1, "name"), Some(Value::String("way too ".into())));
    assert_eq!(back.cell(2, "name"), Some(Value::String(String::new())));
    assert_eq!(back.cell(3, "name"), Some(Value::String("exactly8".into())));
    assert_eq!(back.cell(3, "x"), Some(Value::Double(3.0)));

    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
    assert_eq!(back.page().row_count(), 0);
    assert_eq!(back.parameter("step"), Some(&Value::Long(8)));
    assert!(back.array("profile").is_none());
    assert!(back.array("tags").is_none());

    // Past the last page: the end-of-file signal, not an error, repeatably.
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::EndOfFile);
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::EndOfFile);
}

#[rstest]
#[case::row_major(PageIoOptions::default())]
#[case::column_major(PageIoOptions::default().with_column_major())]
#[case::small_buffers(PageIoOptions::default().with_buffer_sizes(16, 16))]
#[case::unbuffered(PageIoOptions::default().with_buffer_sizes(0, 0))]
fn numeric_round_trip_layouts(#[case] options: PageIoOptions) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("numeric.sdds");

    let mut dataset = Dataset::new(numeric_schema());
    fill_numeric(&mut dataset, 0..100);
    let mut writer = SddsWriter::create(&path, SoloComm, &dataset, options.clone(), None).unwrap();
    writer.write_page(&mut dataset).unwrap();
    writer.close().unwrap();

    let mut reader = SddsReader::open(&path, SoloComm, options).unwrap();
    let mut back = reader.dataset();
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
    assert_eq!(back.page().row_count(), 100);
    for r in 0..100u64 {
        assert_eq!(back.cell(r as usize, "a"), Some(Value::Double(r as f64 * 0.5)));
        assert_eq!(back.cell(r as usize, "b"), Some(Value::Long(r as i32 - 3)));
    }
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::EndOfFile);
}

#[test]
fn endianness_round_trip_preserves_memory_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("swapped.sdds");
    let options = PageIoOptions::default().with_byte_order(foreign_order());

    let mut dataset = Dataset::new(numeric_schema());
    fill_numeric(&mut dataset, 0..10);
    let before: Vec<f64> = dataset.page().columns()[0].as_double().unwrap().to_vec();

    let mut writer = SddsWriter::create(&path, SoloComm, &dataset, options.clone(), None).unwrap();
    writer.write_page(&mut dataset).unwrap();
    writer.close().unwrap();

    // Swap pairing: a non-native write leaves the in-memory data native.
    assert_eq!(dataset.page().columns()[0].as_double().unwrap(), &before[..]);

    let mut reader = SddsReader::open(&path, SoloComm, options).unwrap();
    assert_eq!(reader.header().byte_order, foreign_order());
    let mut back = reader.dataset();
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
    assert_eq!(back.page().columns()[0].as_double().unwrap(), &before[..]);
    assert_eq!(
        back.page().columns()[1].as_long().unwrap(),
        dataset.page().columns()[1].as_long().unwrap()
    );
}

fn row_block_start(path: &Path) -> u64 {
    // Header, then a title that is just the 4-byte row count for a schema
    // with no parameters or arrays.
    let info = crate::parse_header(&std::fs::read(path).unwrap()).unwrap();
    info.header_len + 4
}

#[test]
fn truncated_tail_is_a_hard_error_without_recovery() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cut.sdds");
    let options = PageIoOptions::default();

    let mut dataset = Dataset::new(numeric_schema());
    fill_numeric(&mut dataset, 0..6);
    let mut writer = SddsWriter::create(&path, SoloComm, &dataset, options.clone(), None).unwrap();
    writer.write_page(&mut dataset).unwrap();
    writer.close().unwrap();

    // Cut mid-way through the third row (row width 8 + 4).
    let cut = row_block_start(&path) + 2 * 12 + 5;
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(cut).unwrap();

    let mut reader = SddsReader::open(&path, SoloComm, options).unwrap();
    let mut back = reader.dataset();
    let err = reader.read_page(&mut back).unwrap_err();
    assert!(
        matches!(
            err,
            SddsError::Truncated { .. } | SddsError::UnexpectedEof { .. }
        ),
        "unexpected error: {err}"
    );
    // The page keeps the rows that decoded cleanly, and the failure sticks:
    // retrying without recovery does not silently move on.
    assert_eq!(back.page().row_count(), 2);
    assert!(reader.read_page(&mut back).is_err());

    // A recovery-mode reader picks the same dataset back up.
    let recovering = PageIoOptions::default().with_auto_recovery();
    let mut reader = SddsReader::open(&path, SoloComm, recovering).unwrap();
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
    assert_eq!(back.page().row_count(), 2);
    assert!(back.is_auto_recovered());
}

#[test]
fn auto_recovery_keeps_partial_page_and_then_ends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recover.sdds");

    let mut dataset = Dataset::new(numeric_schema());
    fill_numeric(&mut dataset, 0..6);
    let mut writer =
        SddsWriter::create(&path, SoloComm, &dataset, PageIoOptions::default(), None).unwrap();
    writer.write_page(&mut dataset).unwrap();
    writer.close().unwrap();

    let cut = row_block_start(&path) + 2 * 12 + 5;
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(cut).unwrap();

    let options = PageIoOptions::default().with_auto_recovery();
    let mut reader = SddsReader::open(&path, SoloComm, options).unwrap();
    let mut back = reader.dataset();
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
    assert_eq!(back.page().row_count(), 2);
    assert_eq!(back.cell(1, "a"), Some(Value::Double(0.5)));
    assert!(back.is_auto_recovered());
    // Further reads short-circuit without touching the file again.
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::EndOfFile);
}

#[test]
fn rounded_row_count_treats_declared_as_hint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rounded.sdds");
    let options = PageIoOptions::default()
        .with_row_count_mode(RowCountMode::Rounded { increment: 8 });

    let mut dataset = Dataset::new(numeric_schema());
    fill_numeric(&mut dataset, 0..5);
    let mut writer = SddsWriter::create(&path, SoloComm, &dataset, options.clone(), None).unwrap();
    writer.write_page(&mut dataset).unwrap();
    writer.close().unwrap();

    let mut reader = SddsReader::open(&path, SoloComm, options).unwrap();
    let mut back = reader.dataset();
    // The title declares 8 rows; running out of file at 5 is normal.
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
    assert_eq!(back.page().row_count(), 5);
    assert!(!back.is_auto_recovered());
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::EndOfFile);
}

#[test]
fn string_columns_rejected_in_column_major_and_collective() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = Dataset::new(beam_schema());
    assert!(SddsWriter::create(
        dir.path().join("cm.sdds"),
        SoloComm,
        &dataset,
        PageIoOptions::default().with_column_major(),
        None,
    )
    .is_err());
    assert!(SddsWriter::create(
        dir.path().join("coll.sdds"),
        SoloComm,
        &dataset,
        PageIoOptions::default().with_collective_rows(),
        None,
    )
    .is_err());
}

fn parallel_write(path: PathBuf, options: PageIoOptions, workers: usize, rows_per_worker: u64) {
    let results = run_workers(workers, move |comm| {
        let rank = comm.rank() as u64;
        let mut dataset = Dataset::new(numeric_schema());
        fill_numeric(
            &mut dataset,
            rank * rows_per_worker..(rank + 1) * rows_per_worker,
        );
        let mut writer =
            SddsWriter::create(&path, comm, &dataset, options.clone(), None).unwrap();
        writer.write_page(&mut dataset).unwrap();
        writer.close().unwrap();
    });
    assert_eq!(results.len(), workers);
}

#[test]
fn multi_worker_write_then_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parallel.sdds");
    parallel_write(path.clone(), PageIoOptions::default(), 3, 5);

    // Solo read sees every worker's rows in rank order.
    let mut reader = SddsReader::open(&path, SoloComm, PageIoOptions::default()).unwrap();
    let mut back = reader.dataset();
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
    assert_eq!(back.page().row_count(), 15);
    for r in 0..15u64 {
        assert_eq!(back.cell(r as usize, "a"), Some(Value::Double(r as f64 * 0.5)));
    }

    // Parallel read: each worker gets its assigned contiguous share.
    let read_path = path.clone();
    let totals = run_workers(3, move |comm| {
        let share = assign_rows(15, comm.size(), comm.rank(), true);
        let mut reader =
            SddsReader::open(&read_path, comm, PageIoOptions::default()).unwrap();
        let mut back = reader.dataset();
        assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
        assert_eq!(back.page().row_count() as u64, share.count);
        for (local, global) in (share.start..share.end()).enumerate() {
            assert_eq!(
                back.cell(local, "a"),
                Some(Value::Double(global as f64 * 0.5))
            );
        }
        back.page().row_count() as u64
    });
    assert_eq!(totals.iter().sum::<u64>(), 15);
}

#[test]
fn multi_worker_column_major_spans_each_column_across_the_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cm-parallel.sdds");
    let options = PageIoOptions::default().with_column_major();
    parallel_write(path.clone(), options.clone(), 2, 5);

    // Wire layout is per column, not per worker: a solo writer of the same
    // ten rows must produce the identical file.
    let solo = dir.path().join("cm-solo.sdds");
    let mut dataset = Dataset::new(numeric_schema());
    fill_numeric(&mut dataset, 0..10);
    let mut writer = SddsWriter::create(&solo, SoloComm, &dataset, options, None).unwrap();
    writer.write_page(&mut dataset).unwrap();
    writer.close().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), std::fs::read(&solo).unwrap());

    // A solo reader sees every worker's rows in order.
    let mut reader = SddsReader::open(&path, SoloComm, PageIoOptions::default()).unwrap();
    let mut back = reader.dataset();
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
    assert_eq!(back.page().row_count(), 10);
    for r in 0..10u64 {
        assert_eq!(back.cell(r as usize, "a"), Some(Value::Double(r as f64 * 0.5)));
        assert_eq!(back.cell(r as usize, "b"), Some(Value::Long(r as i32 - 3)));
    }

    // And two workers split each column block along their row shares.
    let read_path = path.clone();
    let counts = run_workers(2, move |comm| {
        let share = assign_rows(10, comm.size(), comm.rank(), true);
        let mut reader = SddsReader::open(&read_path, comm, PageIoOptions::default()).unwrap();
        let mut back = reader.dataset();
        assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
        for (local, global) in (share.start..share.end()).enumerate() {
            assert_eq!(
                back.cell(local, "b"),
                Some(Value::Long(global as i32 - 3))
            );
        }
        back.page().row_count() as u64
    });
    assert_eq!(counts.iter().sum::<u64>(), 10);
}

#[test]
fn collective_and_independent_files_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let independent = dir.path().join("independent.sdds");
    let collective = dir.path().join("collective.sdds");
    parallel_write(independent.clone(), PageIoOptions::default(), 3, 4);
    parallel_write(
        collective.clone(),
        PageIoOptions::default().with_collective_rows(),
        3,
        4,
    );
    assert_eq!(
        std::fs::read(&independent).unwrap(),
        std::fs::read(&collective).unwrap()
    );
}

#[test]
fn master_can_sit_out_row_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-master.sdds");
    parallel_write(path.clone(), PageIoOptions::default(), 3, 4);

    let read_path = path.clone();
    let counts = run_workers(3, move |comm| {
        let options = PageIoOptions::default().without_master_rows();
        let mut reader = SddsReader::open(&read_path, comm, options).unwrap();
        let mut back = reader.dataset();
        assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
        back.page().row_count() as u64
    });
    assert_eq!(counts[0], 0);
    assert_eq!(counts.iter().sum::<u64>(), 12);
}

#[test]
fn row_flags_filter_row_major_pages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flagged.sdds");

    let mut dataset = Dataset::new(numeric_schema());
    fill_numeric(&mut dataset, 0..10);
    for r in 0..10 {
        dataset.page_mut().set_row_flag(r, r % 2 == 0).unwrap();
    }
    let mut writer =
        SddsWriter::create(&path, SoloComm, &dataset, PageIoOptions::default(), None).unwrap();
    writer.write_page(&mut dataset).unwrap();
    writer.close().unwrap();

    let mut reader = SddsReader::open(&path, SoloComm, PageIoOptions::default()).unwrap();
    let mut back = reader.dataset();
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
    assert_eq!(back.page().row_count(), 5);
    for (i, r) in [0u64, 2, 4, 6, 8].into_iter().enumerate() {
        assert_eq!(back.cell(i, "b"), Some(Value::Long(r as i32 - 3)));
    }
}

fn measured_title_len(dataset: &Dataset, declared: u64) -> u64 {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("title.bin");
    let mut file = SharedFile::create(&path).unwrap();
    let mut chan = WriteChannel::new(&mut file, 64);
    title::write_title(&mut chan, dataset, false, declared).unwrap();
    chan.flush().unwrap();
    file.view()
}

#[test]
fn title_byte_len_matches_what_the_writer_emits() {
    // No parameters or arrays.
    let dataset = Dataset::new(numeric_schema());
    assert_eq!(measured_title_len(&dataset, 3), title_byte_len(&dataset, 3));
    assert_eq!(title_byte_len(&dataset, 3), 4);

    // The 64-bit row count branch.
    let big = i32::MAX as u64 + 10;
    assert_eq!(measured_title_len(&dataset, big), title_byte_len(&dataset, big));
    assert_eq!(title_byte_len(&dataset, big), 12);

    // A string parameter left at its null (empty) value.
    let mut schema = Schema::new();
    schema
        .add_parameter(ParameterDef::new("note", SddsType::String))
        .unwrap();
    schema
        .add_array(ArrayDef::new("counts", SddsType::Long, 2))
        .unwrap();
    schema.add_array(ArrayDef::new("names", SddsType::String, 1)).unwrap();
    let mut dataset = Dataset::new(schema);
    assert_eq!(measured_title_len(&dataset, 0), title_byte_len(&dataset, 0));

    // A numeric array with zero elements but a non-null dimension vector,
    // and a string array with mixed null and non-null elements.
    let counts = ArrayValue::new(
        &dataset.schema().arrays()[0].clone(),
        vec![2, 0],
        ColumnStore::Long(Vec::new()),
    )
    .unwrap();
    dataset.set_array("counts", Some(counts)).unwrap();
    let names = ArrayValue::new(
        &dataset.schema().arrays()[1].clone(),
        vec![3],
        ColumnStore::String(vec!["a".into(), String::new(), "bcd".into()]),
    )
    .unwrap();
    dataset.set_array("names", Some(names)).unwrap();
    assert_eq!(measured_title_len(&dataset, 1), title_byte_len(&dataset, 1));
}

#[test]
fn random_pages_round_trip_every_numeric_type() {
    use rand::Rng;

    let mut schema = Schema::new();
    schema.add_column(ColumnDef::new("d", SddsType::Double)).unwrap();
    schema.add_column(ColumnDef::new("f", SddsType::Float)).unwrap();
    schema.add_column(ColumnDef::new("l64", SddsType::Long64)).unwrap();
    schema.add_column(ColumnDef::new("ul64", SddsType::ULong64)).unwrap();
    schema.add_column(ColumnDef::new("l", SddsType::Long)).unwrap();
    schema.add_column(ColumnDef::new("ul", SddsType::ULong)).unwrap();
    schema.add_column(ColumnDef::new("s", SddsType::Short)).unwrap();
    schema.add_column(ColumnDef::new("us", SddsType::UShort)).unwrap();
    schema.add_column(ColumnDef::new("c", SddsType::Character)).unwrap();

    let mut rng = rand::rng();
    let mut dataset = Dataset::new(schema.clone());
    let mut pages: Vec<Dataset> = Vec::new();
    for _ in 0..3 {
        dataset.start_page(0);
        for _ in 0..rng.random_range(0..50) {
            dataset
                .append_row(&[
                    Value::Double(rng.random()),
                    Value::Float(rng.random()),
                    Value::Long64(rng.random()),
                    Value::ULong64(rng.random()),
                    Value::Long(rng.random()),
                    Value::ULong(rng.random()),
                    Value::Short(rng.random()),
                    Value::UShort(rng.random()),
                    Value::Character(rng.random()),
                ])
                .unwrap();
        }
        let mut copy = Dataset::new(schema.clone());
        for col in 0..9 {
            *copy.page_mut().columns_mut().get_mut(col).unwrap() =
                dataset.page().columns()[col].clone();
        }
        copy.page_mut().set_row_count(dataset.page().row_count());
        pages.push(copy);
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("random.sdds");
    let mut writer =
        SddsWriter::create(&path, SoloComm, &dataset, PageIoOptions::default(), None).unwrap();
    for expected in &pages {
        dataset.start_page(0);
        for col in 0..9 {
            *dataset.page_mut().columns_mut().get_mut(col).unwrap() =
                expected.page().columns()[col].clone();
        }
        dataset.page_mut().set_row_count(expected.page().row_count());
        writer.write_page(&mut dataset).unwrap();
    }
    writer.close().unwrap();

    let mut reader = SddsReader::open(&path, SoloComm, PageIoOptions::default()).unwrap();
    let mut back = reader.dataset();
    for expected in &pages {
        assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::Page);
        assert_eq!(back.page().columns(), expected.page().columns());
    }
    assert_eq!(reader.read_page(&mut back).unwrap(), PageStatus::EndOfFile);
}

#[test]
fn row_skip_discards_without_storing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skip.sdds");

    let mut dataset = Dataset::new(numeric_schema());
    fill_numeric(&mut dataset, 0..3);
    let mut writer =
        SddsWriter::create(&path, SoloComm, &dataset, PageIoOptions::default(), None).unwrap();
    writer.write_page(&mut dataset).unwrap();
    writer.close().unwrap();

    let start = row_block_start(&path);
    let mut file = SharedFile::open(&path).unwrap();
    file.set_view(start);
    let mut chan = ReadChannel::new(&mut file, 64);
    let mut back = Dataset::new(numeric_schema());

    // Skim past the first two rows without materializing them, then decode
    // the third normally.
    let skimmed = row::read_rows_row_major(&mut chan, &mut back, 2, 10, false, false);
    assert_eq!(skimmed.rows, 2);
    assert!(skimmed.error.is_none());
    assert_eq!(back.page().row_count(), 0);

    let kept = row::read_rows_row_major(&mut chan, &mut back, 1, 10, false, true);
    assert_eq!(kept.rows, 1);
    assert_eq!(back.page().row_count(), 1);
    assert_eq!(back.cell(0, "a"), Some(Value::Double(1.0)));
    assert_eq!(back.cell(0, "b"), Some(Value::Long(-1)));
}
