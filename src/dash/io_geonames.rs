// Postal code reference in the GeoNames export format.
//
// Tab-separated, no header:
// country code, postal code, place name, admin name1, admin code1, admin name2, admin code2,
// admin name3, admin code3, latitude, longitude, accuracy

use std::collections::HashMap;
use std::io::Read;

use cultures_map::Geocoder;

use crate::dash::*;

const COUNTRY_IDX: usize = 0;
const POSTAL_CODE_IDX: usize = 1;
const LATITUDE_IDX: usize = 9;
const LONGITUDE_IDX: usize = 10;

/// Coordinates of the postal codes of one country.
///
/// The places sharing a postal code are merged into their average position.
#[derive(PartialEq, Debug, Clone)]
pub struct GeoNamesTable {
    country: String,
    points: HashMap<String, GeoPoint>,
}

impl GeoNamesTable {
    pub fn from_path(path: &str, country: &str) -> DashResult<GeoNamesTable> {
        let file = fs::File::open(path).context(OpeningGeoNamesSnafu { path })?;
        let table = GeoNamesTable::from_reader(file, country)?;
        info!(
            "GeoNamesTable: {} postal codes for {} from {}",
            table.len(),
            table.country,
            simplify_file_name(path)
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R, country: &str) -> DashResult<GeoNamesTable> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let mut sums: HashMap<String, (f64, f64, u32)> = HashMap::new();
        for (idx, line_r) in rdr.records().enumerate() {
            let line = match line_r {
                Ok(l) => l,
                Err(e) => {
                    warn!("GeoNamesTable: line {}: skipping: {}", idx + 1, e);
                    continue;
                }
            };
            if !line
                .get(COUNTRY_IDX)
                .map_or(false, |c| c.eq_ignore_ascii_case(country))
            {
                continue;
            }
            let coordinates = (
                line.get(POSTAL_CODE_IDX).map(|s| s.trim()),
                line.get(LATITUDE_IDX).and_then(|s| s.trim().parse::<f64>().ok()),
                line.get(LONGITUDE_IDX).and_then(|s| s.trim().parse::<f64>().ok()),
            );
            match coordinates {
                (Some(code), Some(lat), Some(lon)) if !code.is_empty() => {
                    let e = sums.entry(code.to_string()).or_insert((0.0, 0.0, 0));
                    e.0 += lat;
                    e.1 += lon;
                    e.2 += 1;
                }
                _ => {
                    debug!("GeoNamesTable: line {}: incomplete entry {:?}", idx + 1, line);
                }
            }
        }

        if sums.is_empty() {
            whatever!("The postal code reference has no entry for country {}", country);
        }

        let points = sums
            .into_iter()
            .map(|(code, (lat, lon, n))| {
                (
                    code,
                    GeoPoint {
                        latitude: lat / n as f64,
                        longitude: lon / n as f64,
                    },
                )
            })
            .collect();
        Ok(GeoNamesTable {
            country: country.to_uppercase(),
            points,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn get(&self, postal_code: &str) -> Option<GeoPoint> {
        self.points.get(postal_code.trim()).copied()
    }
}

impl Geocoder for GeoNamesTable {
    fn query_postal_codes(
        &self,
        postal_codes: &[String],
    ) -> Result<Vec<Option<GeoPoint>>, MapErrors> {
        Ok(postal_codes.iter().map(|c| self.get(c)).collect())
    }
}
