use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;

use crate::config::*;

/// A bidirectional mapping between department names and department codes.
///
/// Names are stored uppercased, so lookups by name are case-insensitive.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct DepartmentReference {
    by_name: HashMap<String, String>,
    by_code: HashMap<String, String>,
}

impl DepartmentReference {
    /// Builds the reference from (code, name) pairs.
    pub fn new<I, S, T>(entries: I) -> DepartmentReference
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut by_name = HashMap::new();
        let mut by_code = HashMap::new();
        for (code, name) in entries {
            let code = code.as_ref().trim().to_string();
            let name = name.as_ref().trim().to_string();
            by_name.insert(name.to_uppercase(), code.clone());
            by_code.insert(code, name);
        }
        DepartmentReference { by_name, by_code }
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Gets the name of a department from its code (e.g. "35" -> "Ille-et-Vilaine").
    pub fn name(&self, code: &str) -> Option<&String> {
        self.by_code.get(code)
    }

    /// Gets the code of a department from its name, ignoring the case.
    pub fn code(&self, name: &str) -> Option<&String> {
        self.by_name.get(&name.trim().to_uppercase())
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    /// Maps a raw department label to a canonical code.
    ///
    /// Labels that already look like a code are returned as-is, without checking the reference.
    /// Other labels are looked up by name.
    pub fn resolve(&self, label: &str) -> Option<String> {
        let label = label.trim();
        if is_department_code(label) {
            Some(label.to_string())
        } else {
            self.code(label).cloned()
        }
    }
}

/// True for 2 or 3 digits, and for the Corsican codes "2A" and "2B".
pub fn is_department_code(label: &str) -> bool {
    let b = label.as_bytes();
    match b {
        [b'2', b'A'] | [b'2', b'B'] => true,
        _ => (2..=3).contains(&b.len()) && b.iter().all(|c| c.is_ascii_digit()),
    }
}

/// Groups the records by resolved department code.
///
/// Records without a department, or whose label cannot be resolved, are left out and counted
/// separately.
pub fn aggregate_departments(
    records: &[Record],
    reference: &DepartmentReference,
    metric: Metric,
) -> DepartmentAggregation {
    let mut groups: BTreeMap<String, (u64, BTreeSet<&str>)> = BTreeMap::new();
    let mut unresolved_labels = 0;
    let mut missing_labels = 0;
    for r in records.iter() {
        let label = match r.department.as_deref() {
            Some(l) => l,
            None => {
                missing_labels += 1;
                continue;
            }
        };
        match reference.resolve(label) {
            Some(code) => {
                let e = groups.entry(code).or_default();
                e.0 += 1;
                e.1.insert(r.culture.as_str());
            }
            None => {
                debug!("aggregate_departments: unresolved label {:?}", label);
                unresolved_labels += 1;
            }
        }
    }

    let mut unknown_codes = 0;
    let rows: Vec<DepartmentRow> = groups
        .into_iter()
        .map(|(code, (count, cultures))| {
            let name = reference.name(&code).cloned();
            if name.is_none() {
                unknown_codes += 1;
            }
            let value = match metric {
                Metric::RecordCount => count,
                Metric::DistinctCultures => cultures.len() as u64,
            };
            DepartmentRow { code, name, value }
        })
        .collect();

    DepartmentAggregation {
        rows,
        unresolved_labels,
        missing_labels,
        unknown_codes,
    }
}
