// The state kept between render passes.
//
// Parsed tables and geocoding results are keyed by the digest of the input bytes and the way
// they are decoded: reloading identical content does not parse or geocode again. The department
// boundaries are fetched at most once per session.

use std::collections::HashMap;
use std::rc::Rc;

use once_cell::unsync::OnceCell;

use crate::dash::*;

type TableKey = (String, InputFormat);

pub struct Session {
    geocoder: Box<dyn Geocoder>,
    departments: Box<dyn DepartmentSource>,
    tables: HashMap<TableKey, Rc<RecordTable>>,
    located: HashMap<TableKey, Rc<LocatedTable>>,
    department_data: OnceCell<Rc<DepartmentData>>,
    parse_count: usize,
}

impl Session {
    pub fn new(geocoder: Box<dyn Geocoder>, departments: Box<dyn DepartmentSource>) -> Session {
        Session {
            geocoder,
            departments,
            tables: HashMap::new(),
            located: HashMap::new(),
            department_data: OnceCell::new(),
            parse_count: 0,
        }
    }

    /// The number of times some input was actually parsed.
    pub fn parse_count(&self) -> usize {
        self.parse_count
    }

    pub fn load(
        &mut self,
        content: &[u8],
        name: &str,
        format: &InputFormat,
    ) -> BDashResult<Rc<RecordTable>> {
        let key = (content_digest(content), format.clone());
        if let Some(table) = self.tables.get(&key) {
            debug!("Session::load: {}: cached table {}", name, key.0);
            return Ok(table.clone());
        }

        let table = match format {
            InputFormat::Csv { delimiter } => read_csv_table(content, *delimiter, key.0.clone())?,
            InputFormat::Xlsx { worksheet } => {
                read_excel_table(content, name, worksheet.as_deref(), key.0.clone())?
            }
        };
        self.parse_count += 1;
        let table = Rc::new(table);
        self.tables.insert(key, table.clone());
        Ok(table)
    }

    pub fn locate(
        &mut self,
        table: &RecordTable,
        format: &InputFormat,
    ) -> DashResult<Rc<LocatedTable>> {
        let key = (table.digest.clone(), format.clone());
        if let Some(located) = self.located.get(&key) {
            debug!("Session::locate: cached coordinates for {}", key.0);
            return Ok(located.clone());
        }
        let located = Rc::new(
            locate_records(&table.records, self.geocoder.as_ref()).context(PipelineSnafu {})?,
        );
        info!(
            "Session::locate: {} of {} records located",
            located.records.len(),
            table.records.len()
        );
        self.located.insert(key, located.clone());
        Ok(located)
    }

    pub fn department_data(&self) -> DashResult<Rc<DepartmentData>> {
        let data = self.department_data.get_or_try_init(|| {
            info!(
                "Session::department_data: loading {}",
                self.departments.describe()
            );
            let text = self.departments.fetch_text()?;
            parse_departments(&text).map(Rc::new)
        })?;
        Ok(data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Nowhere {}

    impl Geocoder for Nowhere {
        fn query_postal_codes(
            &self,
            postal_codes: &[String],
        ) -> Result<Vec<Option<GeoPoint>>, MapErrors> {
            Ok(postal_codes
                .iter()
                .map(|_| {
                    Some(GeoPoint {
                        latitude: 45.0,
                        longitude: 1.0,
                    })
                })
                .collect())
        }
    }

    struct CountingSource {
        calls: Rc<Cell<usize>>,
    }

    impl DepartmentSource for CountingSource {
        fn describe(&self) -> String {
            "counting".to_string()
        }

        fn fetch_text(&self) -> DashResult<String> {
            self.calls.set(self.calls.get() + 1);
            Ok(r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "geometry": null, "properties": {"code": "33", "nom": "Gironde"}}
            ]}"#
            .to_string())
        }
    }

    fn session(calls: &Rc<Cell<usize>>) -> Session {
        Session::new(
            Box::new(Nowhere {}),
            Box::new(CountingSource {
                calls: calls.clone(),
            }),
        )
    }

    const CONTENT: &[u8] = b"CODE_POSTAL;TYPO_CULTURE\n33000;Viticulture\n1000;Vigne\n";

    #[test]
    fn identical_content_is_parsed_once() {
        let calls = Rc::new(Cell::new(0));
        let mut s = session(&calls);
        let csv = InputFormat::Csv { delimiter: b';' };
        let t1 = s.load(CONTENT, "a.csv", &csv).unwrap();
        let t2 = s.load(&CONTENT.to_vec(), "b.csv", &csv).unwrap();
        assert!(Rc::ptr_eq(&t1, &t2));
        assert_eq!(s.parse_count(), 1);

        let l1 = s.locate(&t1, &csv).unwrap();
        let l2 = s.locate(&t2, &csv).unwrap();
        assert!(Rc::ptr_eq(&l1, &l2));
        assert_eq!(l1.records.len(), 2);
    }

    #[test]
    fn decoding_is_part_of_the_key() {
        let calls = Rc::new(Cell::new(0));
        let mut s = session(&calls);
        s.load(CONTENT, "a.csv", &InputFormat::Csv { delimiter: b';' })
            .unwrap();
        // Read with a comma, the single column is missing the required ones.
        assert!(s
            .load(CONTENT, "a.csv", &InputFormat::Csv { delimiter: b',' })
            .is_err());
        s.load(
            b"CODE_POSTAL;TYPO_CULTURE\n75001;Maraichage\n",
            "a.csv",
            &InputFormat::Csv { delimiter: b';' },
        )
        .unwrap();
        assert_eq!(s.parse_count(), 2);
    }

    #[test]
    fn departments_are_fetched_once() {
        let calls = Rc::new(Cell::new(0));
        let s = session(&calls);
        let d1 = s.department_data().unwrap();
        let d2 = s.department_data().unwrap();
        assert!(Rc::ptr_eq(&d1, &d2));
        assert_eq!(calls.get(), 1);
        assert_eq!(d1.reference.len(), 1);
    }
}
