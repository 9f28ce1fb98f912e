// tests/pipeline_e2e.rs

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    io::{Cursor, Write},
    path::Path,
};

use chrono::NaiveDate;
use etscraper::{
    config::Config,
    error::EtlError,
    fetch::Fetch,
    logging::init_test_logging,
    pipeline::{run, RunOutcome},
};
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

const LANDING: &str = "https://stats.example.gov.uk/oil-and-oil-products";
const FILE_URL: &str = "https://stats.example.gov.uk/media/abc/ET_3.1_JUL_23.xlsx";

/// Serves canned bodies and records every URL asked for.
struct CannedFetcher {
    pages: HashMap<String, Vec<u8>>,
    requested: RefCell<Vec<String>>,
}

impl Fetch for CannedFetcher {
    fn get(&self, url: &str) -> Result<Vec<u8>, EtlError> {
        self.requested.borrow_mut().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| EtlError::RetriesExhausted {
                url: url.to_string(),
                attempts: 1,
                last: "HTTP 404 Not Found".into(),
            })
    }
}

enum Value<'a> {
    Text(&'a str),
    Number(f64),
}

fn column_letter(idx: usize) -> char {
    (b'A' + idx as u8) as char
}

fn sheet_xml(rows: &[Vec<Option<Value>>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, cell) in row.iter().enumerate() {
            let at = format!("{}{}", column_letter(c), r + 1);
            match cell {
                Some(Value::Text(t)) => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    at, t
                )),
                Some(Value::Number(n)) => {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, at, n))
                }
                None => {}
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn workbook(sheets: &[(&str, String)]) -> Vec<u8> {
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    let mut book = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            n
        ));
        book.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            name, n, n
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            n, n
        ));
    }
    content_types.push_str("</Types>");
    book.push_str("</sheets></workbook>");
    rels.push_str("</Relationships>");

    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

    let mut parts: Vec<(String, String)> = vec![
        ("[Content_Types].xml".into(), content_types),
        ("_rels/.rels".into(), root_rels.into()),
        ("xl/workbook.xml".into(), book),
        ("xl/_rels/workbook.xml.rels".into(), rels),
    ];
    for (i, (_, xml)) in sheets.iter().enumerate() {
        parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), xml.clone()));
    }

    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        for (name, body) in &parts {
            let options: FileOptions<'_, ()> =
                FileOptions::default().compression_method(CompressionMethod::Stored);
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

/// Cover sheet plus a 12-row, 2-period data sheet laid out like ET 3.1.
fn et31_workbook() -> Vec<u8> {
    use Value::{Number, Text};

    let cover = sheet_xml(&[
        vec![Some(Text("Energy Trends section 3: oil and oil products"))],
        vec![],
        vec![Some(Text("Supply and use of crude oil, natural gas liquids and feedstocks"))],
        vec![Some(Text("This spreadsheet was published on 30 July 2023"))],
    ]);

    let labels = [
        "Indigenous production",
        "Crude oil [note 1]",
        "NGLs [note 2]",
        "Feedstocks [note 3]",
        "Imports",
        "Crude oil [note 4]",
        "NGLs [note 5]",
        "Feedstocks [note 6]",
        "Exports",
        "Crude oil [note 7]",
        "NGLs [note 8]",
        "Feedstocks [note 9]",
    ];
    let mut rows: Vec<Vec<Option<Value>>> = vec![
        vec![Some(Text("ET 3.1 Supply and use of crude oil"))],
        vec![Some(Text("Thousand tonnes"))],
        vec![],
        vec![Some(Text("This worksheet contains one table."))],
        vec![None, Some(Text("2023 1st quarter")), Some(Text("2023 2nd quarter"))],
    ];
    for (i, label) in labels.into_iter().enumerate() {
        let base = 1000.0 + 10.0 * i as f64;
        rows.push(vec![Some(Text(label)), Some(Number(base + 0.5)), Some(Number(base + 1.25))]);
    }
    let data = sheet_xml(&rows);

    workbook(&[("Cover Sheet", cover), ("Quarter", data)])
}

fn fetcher() -> CannedFetcher {
    let html = format!(
        r#"<html><body>
            <a class="govuk-link gem-c-attachment__link" href="/media/xyz/ET_3.2.xlsx">Stocks of petroleum</a>
            <a class="govuk-link gem-c-attachment__link" href="{}">
              Supply and use of crude oil, natural gas liquids and feedstocks (ET 3.1 - quarterly)
            </a>
        </body></html>"#,
        FILE_URL
    );
    CannedFetcher {
        pages: HashMap::from([
            (LANDING.to_string(), html.into_bytes()),
            (FILE_URL.to_string(), et31_workbook()),
        ]),
        requested: RefCell::new(Vec::new()),
    }
}

fn config(dir: &Path) -> Config {
    Config {
        landing_url: LANDING.into(),
        ledger_path: dir.join("submit_csv").join("DeltaTable.csv"),
        fallback_ledger_path: dir.join("DeltaTable.csv"),
        log_dir: dir.join("logs"),
        ..Config::default()
    }
}

fn processed_at() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 8, 1)
        .unwrap()
        .and_hms_opt(9, 15, 0)
        .unwrap()
}

#[test]
fn ingests_then_skips_the_same_file() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let fetcher = fetcher();

    let outcome = run(&cfg, &fetcher, processed_at()).unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Ingested {
            filename: "ET_3.1_JUL_23.xlsx".into(),
            rows_written: 24,
            rows_skipped: 0,
        }
    );

    let mut rdr = csv::Reader::from_path(&cfg.ledger_path).unwrap();
    let header: Vec<String> = rdr.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(
        header,
        vec![
            "resource",
            "category",
            "figures",
            "year",
            "quarter",
            "date_published",
            "date_processed",
            "filename"
        ]
    );
    let records: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), 24);

    let mut keys = HashSet::new();
    for r in &records {
        assert_eq!(&r[5], "2023-07-30");
        assert_eq!(&r[6], "2023-08-01 09:15:00");
        assert_eq!(&r[7], "ET_3.1_JUL_23.xlsx");
        assert_eq!(&r[3], "2023");
        assert!(keys.insert((r[0].to_string(), r[1].to_string(), r[3].to_string(), r[4].to_string())));
    }

    let first = &records[0];
    assert_eq!(&first[0], "indigenous production");
    assert_eq!(&first[1], "production");
    assert_eq!(&first[4], "1");
    assert!(records
        .iter()
        .any(|r| &r[0] == "crude oil" && &r[1] == "import" && &r[4] == "2"));
    assert!(records.iter().all(|r| !r[0].contains('[')));

    // Second run sees the filename in the ledger and never downloads.
    let again = run(&cfg, &fetcher, processed_at()).unwrap();
    assert_eq!(
        again,
        RunOutcome::Skipped {
            filename: "ET_3.1_JUL_23.xlsx".into()
        }
    );
    let downloads = fetcher
        .requested
        .borrow()
        .iter()
        .filter(|u| u.as_str() == FILE_URL)
        .count();
    assert_eq!(downloads, 1);
}

#[test]
fn forced_rerun_appends_nothing_new() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    let fetcher = fetcher();

    run(&cfg, &fetcher, processed_at()).unwrap();
    cfg.force_download = true;
    let outcome = run(&cfg, &fetcher, processed_at()).unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Ingested {
            filename: "ET_3.1_JUL_23.xlsx".into(),
            rows_written: 0,
            rows_skipped: 24,
        }
    );
    let text = std::fs::read_to_string(&cfg.ledger_path).unwrap();
    assert_eq!(text.lines().count(), 25);
}

#[test]
fn too_few_rows_fail_integrity_and_leave_ledger_untouched() {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());

    use Value::{Number, Text};
    let cover = sheet_xml(&[
        vec![],
        vec![],
        vec![],
        vec![Some(Text("Published 30 July 2023"))],
    ]);
    let data = sheet_xml(&[
        vec![],
        vec![],
        vec![],
        vec![],
        vec![None, Some(Text("2023 Q1"))],
        vec![Some(Text("Crude oil")), Some(Number(1.0))],
    ]);
    let mut fetcher = fetcher();
    fetcher.pages.insert(
        FILE_URL.to_string(),
        workbook(&[("Cover Sheet", cover), ("Quarter", data)]),
    );

    let err = run(&cfg, &fetcher, processed_at()).unwrap_err();
    assert!(matches!(err, EtlError::InputIntegrity(_)), "{err}");
    assert!(err.is_fatal());
    assert!(!cfg.ledger_path.exists());
}
