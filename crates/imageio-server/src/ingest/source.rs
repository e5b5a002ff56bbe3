//! Tabular row source
//!
//! Reads an uploaded spreadsheet one row at a time. The first physical row is the header
//! and is never yielded. Every yielded row has the same width: one title column followed
//! by one column per image slot, with missing cells as empty strings.
//!
//! Parsing runs on the blocking pool and hands rows to the async side over a bounded
//! channel, so at most a couple of rows are in memory. XLSX sheets are streamed cell by
//! cell; the older XLS, XLSB and ODS containers have no streaming reader and their first
//! sheet is loaded whole.

use calamine::{open_workbook, Data, DataRef, ExcelDateTime, Ods, Reader, Xls, Xlsb, Xlsx};
use std::fmt::Display;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

/// Rows buffered between the parser thread and the consumer
const ROW_BUFFER: usize = 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Spreadsheet could not be read: {0}")]
    Unreadable(String),

    #[error("Spreadsheet contains no data rows.")]
    Empty,
}

fn unreadable(err: impl Display) -> SourceError {
    SourceError::Unreadable(err.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
    Xls,
    Xlsb,
    Ods,
}

impl SourceFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "xlsx" | "xlsm" => Some(Self::Xlsx),
            "xls" | "xla" => Some(Self::Xls),
            "xlsb" => Some(Self::Xlsb),
            "ods" => Some(Self::Ods),
            _ => None,
        }
    }

    /// Detect from the uploaded file name, then the stored path, then magic bytes
    pub fn detect(path: &Path, declared_name: Option<&str>) -> std::io::Result<Self> {
        let by_name = declared_name
            .map(Path::new)
            .into_iter()
            .chain(std::iter::once(path))
            .filter_map(|p| p.extension().and_then(|ext| ext.to_str()))
            .find_map(Self::from_extension);

        if let Some(format) = by_name {
            return Ok(format);
        }

        let mut magic = [0u8; 4];
        let read = File::open(path)?.read(&mut magic)?;
        Ok(match &magic[..read] {
            [0x50, 0x4B, 0x03, 0x04] => Self::Xlsx,
            [0xD0, 0xCF, 0x11, 0xE0] => Self::Xls,
            _ => Self::Csv,
        })
    }
}

/// One data row with its 1-based physical row number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    pub number: u64,
    pub cells: Vec<String>,
}

impl SourceRow {
    fn blank(number: u64, width: usize) -> Self {
        Self {
            number,
            cells: vec![String::new(); width],
        }
    }

    pub fn title(&self) -> &str {
        self.cells.first().map(|cell| cell.trim()).unwrap_or("")
    }

    /// Non-empty image cells as `(position, value)`, positions starting at 1
    pub fn image_cells(&self) -> impl Iterator<Item = (i32, &str)> {
        self.cells
            .iter()
            .skip(1)
            .enumerate()
            .map(|(idx, cell)| (idx as i32 + 1, cell.trim()))
            .filter(|(_, cell)| !cell.is_empty())
    }
}

/// Visitor over rows; returning `false` stops the scan
type Visit<'a> = dyn FnMut(SourceRow) -> bool + 'a;

#[derive(Debug, Clone)]
pub struct RowSource {
    path: PathBuf,
    format: SourceFormat,
    width: usize,
}

impl RowSource {
    /// Open `path` for `image_slots` image columns; `declared_name` is the client's
    /// original file name, used for format detection
    pub fn open(
        path: impl Into<PathBuf>,
        declared_name: Option<&str>,
        image_slots: usize,
    ) -> Result<Self, SourceError> {
        let path = path.into();
        let format = SourceFormat::detect(&path, declared_name).map_err(unreadable)?;
        Ok(Self {
            path,
            format,
            width: image_slots + 1,
        })
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// Count data rows in a streaming pass
    pub async fn count_data_rows(&self) -> Result<u64, SourceError> {
        let source = self.clone();
        tokio::task::spawn_blocking(move || {
            let mut count = 0u64;
            source.scan(&mut |_| {
                count += 1;
                true
            })?;
            Ok(count)
        })
        .await
        .map_err(unreadable)?
    }

    /// Start producing rows; dropping the reader stops the parser
    pub fn rows(&self) -> RowReader {
        let (tx, rx) = mpsc::channel(ROW_BUFFER);
        let source = self.clone();

        tokio::task::spawn_blocking(move || {
            let result = source.scan(&mut |row| tx.blocking_send(Ok(row)).is_ok());
            if let Err(e) = result {
                let _ = tx.blocking_send(Err(e));
            }
        });

        RowReader { rx }
    }

    fn scan(&self, visit: &mut Visit<'_>) -> Result<(), SourceError> {
        match self.format {
            SourceFormat::Csv => scan_csv(&self.path, self.width, visit),
            SourceFormat::Xlsx => scan_xlsx(&self.path, self.width, visit),
            SourceFormat::Xls => {
                scan_range(open_workbook::<Xls<_>, _>(&self.path).map_err(unreadable)?, self.width, visit)
            },
            SourceFormat::Xlsb => {
                scan_range(open_workbook::<Xlsb<_>, _>(&self.path).map_err(unreadable)?, self.width, visit)
            },
            SourceFormat::Ods => {
                scan_range(open_workbook::<Ods<_>, _>(&self.path).map_err(unreadable)?, self.width, visit)
            },
        }
    }
}

/// Receiving end of [`RowSource::rows`]
pub struct RowReader {
    rx: mpsc::Receiver<Result<SourceRow, SourceError>>,
}

impl RowReader {
    pub async fn next(&mut self) -> Option<Result<SourceRow, SourceError>> {
        self.rx.recv().await
    }
}

fn scan_csv(path: &Path, width: usize, visit: &mut Visit<'_>) -> Result<(), SourceError> {
    let delimiter = sniff_delimiter(path).map_err(unreadable)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .map_err(unreadable)?;

    let mut record = csv::ByteRecord::new();
    let mut index = 0u64;
    while reader.read_byte_record(&mut record).map_err(unreadable)? {
        index += 1;
        if index == 1 {
            continue;
        }

        let number = record.position().map(|p| p.line()).unwrap_or(index);
        let cells = (0..width)
            .map(|i| {
                record
                    .get(i)
                    .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                    .unwrap_or_default()
            })
            .collect();

        if !visit(SourceRow { number, cells }) {
            break;
        }
    }
    Ok(())
}

/// Pick `;` or tab over `,` when the header line clearly uses it
fn sniff_delimiter(path: &Path) -> std::io::Result<u8> {
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;

    let count = |c: char| header.matches(c).count();
    Ok([b';', b'\t']
        .into_iter()
        .find(|d| count(*d as char) > count(','))
        .unwrap_or(b','))
}

fn scan_xlsx(path: &Path, width: usize, visit: &mut Visit<'_>) -> Result<(), SourceError> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(unreadable)?;
    let Some(sheet) = workbook.sheet_names().into_iter().next() else {
        return Ok(());
    };

    let mut cells = workbook.worksheet_cells_reader(&sheet).map_err(unreadable)?;
    let mut rows = RowAssembler::new(width);
    while let Some(cell) = cells.next_cell().map_err(unreadable)? {
        let (row, col) = cell.get_position();
        if !rows.push(row, col, data_ref_text(cell.get_value()), visit) {
            return Ok(());
        }
    }
    rows.finish(visit);
    Ok(())
}

fn scan_range<R>(mut workbook: R, width: usize, visit: &mut Visit<'_>) -> Result<(), SourceError>
where
    R: Reader<BufReader<File>>,
    R::Error: Display,
{
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(unreadable)?,
        None => return Ok(()),
    };

    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut rows = RowAssembler::new(width);
    for (row, col, value) in range.used_cells() {
        let (row, col) = (start_row + row as u32, start_col + col as u32);
        if !rows.push(row, col, data_text(value), visit) {
            return Ok(());
        }
    }
    rows.finish(visit);
    Ok(())
}

/// Groups row-major cells into fixed-width rows
///
/// Sheets omit empty rows, so gaps between populated rows are yielded as blank rows to
/// keep physical row numbers and counts stable.
struct RowAssembler {
    width: usize,
    /// Next physical row index (0-based) not yet yielded; the header is index 0
    next_index: u32,
    current: Option<(u32, Vec<String>)>,
}

impl RowAssembler {
    fn new(width: usize) -> Self {
        Self {
            width,
            next_index: 1,
            current: None,
        }
    }

    fn push(&mut self, row: u32, col: u32, value: String, visit: &mut Visit<'_>) -> bool {
        if row == 0 || value.is_empty() {
            return true;
        }

        if let Some((current_row, _)) = self.current {
            if current_row != row {
                if let Some((index, cells)) = self.current.take() {
                    if !self.emit(index, cells, visit) {
                        return false;
                    }
                }
            }
        }

        let width = self.width;
        let (_, cells) = self
            .current
            .get_or_insert_with(|| (row, vec![String::new(); width]));
        if let Some(cell) = cells.get_mut(col as usize) {
            *cell = value;
        }
        true
    }

    fn finish(mut self, visit: &mut Visit<'_>) {
        if let Some((index, cells)) = self.current.take() {
            self.emit(index, cells, visit);
        }
    }

    fn emit(&mut self, index: u32, cells: Vec<String>, visit: &mut Visit<'_>) -> bool {
        while self.next_index < index {
            if !visit(SourceRow::blank(u64::from(self.next_index) + 1, self.width)) {
                return false;
            }
            self.next_index += 1;
        }
        self.next_index = index + 1;
        visit(SourceRow {
            number: u64::from(index) + 1,
            cells,
        })
    }
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Date cells render as `YYYY-MM-DD`, with the time appended when it is not midnight
fn datetime_text(value: &ExcelDateTime) -> String {
    match value.as_datetime() {
        Some(datetime) if !value.is_duration() => {
            if datetime.time() == chrono::NaiveTime::MIN {
                datetime.format("%Y-%m-%d").to_string()
            } else {
                datetime.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        },
        _ => format_float(value.as_f64()),
    }
}

fn data_text(value: &Data) -> String {
    match value {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::DateTime(dt) => datetime_text(dt),
        Data::Float(f) => format_float(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn data_ref_text(value: &DataRef<'_>) -> String {
    match value {
        DataRef::String(s) | DataRef::DateTimeIso(s) | DataRef::DurationIso(s) => s.clone(),
        DataRef::SharedString(s) => (*s).to_string(),
        DataRef::DateTime(dt) => datetime_text(dt),
        DataRef::Float(f) => format_float(*f),
        DataRef::Int(i) => i.to_string(),
        DataRef::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    async fn collect(source: &RowSource) -> Vec<SourceRow> {
        let mut reader = source.rows();
        let mut rows = Vec::new();
        while let Some(row) = reader.next().await {
            rows.push(row.unwrap());
        }
        rows
    }

    #[test]
    fn test_format_detection() {
        let dir = tempfile::tempdir().unwrap();
        let blob = dir.path().join("upload.tmp");

        std::fs::write(&blob, b"PK\x03\x04rest").unwrap();
        assert_eq!(SourceFormat::detect(&blob, None).unwrap(), SourceFormat::Xlsx);
        assert_eq!(
            SourceFormat::detect(&blob, Some("Products.ODS")).unwrap(),
            SourceFormat::Ods
        );

        std::fs::write(&blob, [0xD0, 0xCF, 0x11, 0xE0, 0xA1]).unwrap();
        assert_eq!(SourceFormat::detect(&blob, None).unwrap(), SourceFormat::Xls);

        std::fs::write(&blob, b"title,image-1\n").unwrap();
        assert_eq!(SourceFormat::detect(&blob, None).unwrap(), SourceFormat::Csv);
    }

    #[tokio::test]
    async fn test_csv_rows_are_fixed_width_and_skip_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "items.csv",
            "title,image-1,image-2\nKettle,https://a/1.jpg\nMug,https://a/2.jpg,https://a/3.jpg,x,y,z,overflow\n",
        );
        let source = RowSource::open(&path, None, 5).unwrap();

        assert_eq!(source.count_data_rows().await.unwrap(), 2);

        let rows = collect(&source).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number, 2);
        assert_eq!(rows[0].cells.len(), 6);
        assert_eq!(rows[0].cells[2], "");
        assert_eq!(rows[1].title(), "Mug");
        assert_eq!(rows[1].cells.len(), 6);
        let images: Vec<(i32, &str)> = rows[1].image_cells().collect();
        assert_eq!(images[0], (1, "https://a/2.jpg"));
        assert_eq!(images.len(), 5);
    }

    #[tokio::test]
    async fn test_semicolon_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "items.csv", "title;image-1\nKettle;https://a/1.jpg\n");
        let rows = collect(&RowSource::open(&path, None, 5).unwrap()).await;
        assert_eq!(rows[0].title(), "Kettle");
        assert_eq!(rows[0].cells[1], "https://a/1.jpg");
    }

    #[tokio::test]
    async fn test_header_only_counts_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "empty.csv", "title,image-1\n");
        let source = RowSource::open(&path, None, 5).unwrap();
        assert_eq!(source.count_data_rows().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_xlsx_rows_fill_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "title").unwrap();
        sheet.write_string(0, 1, "image-1").unwrap();
        sheet.write_string(1, 0, "Kettle").unwrap();
        sheet.write_string(1, 1, "https://a/1.jpg").unwrap();
        sheet.write_number(3, 0, 42.0).unwrap();
        sheet.write_string(3, 2, "https://a/2.jpg").unwrap();
        workbook.save(&path).unwrap();

        let source = RowSource::open(&path, None, 5).unwrap();
        assert_eq!(source.format(), SourceFormat::Xlsx);
        assert_eq!(source.count_data_rows().await.unwrap(), 3);

        let rows = collect(&source).await;
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].number, rows[0].title()), (2, "Kettle"));
        assert_eq!((rows[1].number, rows[1].title()), (3, ""));
        assert_eq!((rows[2].number, rows[2].title()), (4, "42"));
        assert_eq!(rows[2].image_cells().collect::<Vec<_>>(), vec![(2, "https://a/2.jpg")]);
    }

    #[tokio::test]
    async fn test_xlsx_date_titles_are_rendered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dated.xlsx");

        let date_format = rust_xlsxwriter::Format::new().set_num_format("yyyy-mm-dd");
        let stamp_format = rust_xlsxwriter::Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
        let day = rust_xlsxwriter::ExcelDateTime::from_ymd(2024, 3, 1).unwrap();
        let stamp = rust_xlsxwriter::ExcelDateTime::from_ymd(2024, 3, 1)
            .unwrap()
            .and_hms(12, 0, 0)
            .unwrap();

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "title").unwrap();
        sheet.write_string(0, 1, "image-1").unwrap();
        sheet.write_datetime_with_format(1, 0, &day, &date_format).unwrap();
        sheet.write_datetime_with_format(2, 0, &stamp, &stamp_format).unwrap();
        workbook.save(&path).unwrap();

        let source = RowSource::open(&path, None, 5).unwrap();
        let rows = collect(&source).await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title(), "2024-03-01");
        assert_eq!(rows[1].title(), "2024-03-01 12:00:00");
    }

    #[tokio::test]
    async fn test_dropping_reader_stops_early() {
        let dir = tempfile::tempdir().unwrap();
        let mut contents = String::from("title,image-1\n");
        for i in 0..100 {
            contents.push_str(&format!("Item {i},\n"));
        }
        let path = write_csv(dir.path(), "many.csv", &contents);
        let source = RowSource::open(&path, None, 5).unwrap();

        let mut reader = source.rows();
        let first = reader.next().await.unwrap().unwrap();
        assert_eq!(first.title(), "Item 0");
        drop(reader);
    }

    #[tokio::test]
    async fn test_garbage_workbook_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();

        let source = RowSource::open(&path, None, 5).unwrap();
        assert!(matches!(
            source.count_data_rows().await,
            Err(SourceError::Unreadable(_))
        ));
    }
}
