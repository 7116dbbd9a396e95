/*!

This is the long-form manual for `cultures_map` and `cultmap`.

## Input formats

The following formats are supported:
* `csv` Semicolon-separated values (the default)
* `xlsx` Excel workbooks

### `csv`

The export of a contact base, one record per line, with a header row. The separator is `;`
by default.

```text
EMAIL;SOCIETE_OU_ORGANISME;CODE_POSTAL;DEPARTEMENT;TYPO_CULTURE
a@exemple.fr;GAEC du Moulin;1000;Ain;Grandes cultures
b@exemple.fr;;33000;33;Viticulture
```

The `CODE_POSTAL` and `TYPO_CULTURE` columns are mandatory, with these exact names. The other
columns are optional and only used when a chart needs them. Lines that cannot be read are
skipped, and records with an empty postal code or culture are dropped. Postal codes are padded
with zeros on the left: `1000` becomes `01000`.

### `xlsx`

The same table in the first worksheet of an Excel file (or in the worksheet given by
`excelWorksheetName`). Numeric cells are accepted for the postal codes.

## Postal code reference

The coordinates of the postal codes come from a postal code export of
[GeoNames](https://download.geonames.org/export/zip/) (for example `FR.txt`). When several
places share a postal code, the average position is used. Records with an unknown postal code
are not drawn on the map; their number is reported in the `excluded` section of the output.

## Departments

The department map needs the boundaries of the departments as GeoJSON, with the `code` and `nom`
properties. They are downloaded once from the configured URL (or read from a local file).

The `DEPARTEMENT` column may contain a code (`75`, `2A`, `971`) or a name (`Paris`). Codes are
used directly, names are matched without regard to case. Values that match neither are left out
of the map and counted as `unresolvedDepartments`. Records with an empty `DEPARTEMENT` are
counted as `missingDepartments`; they are not treated as errors.

## Configuration

`cultmap` comes with sensible defaults, but it also accepts a configuration file in JSON:

```json
{
  "version": 4,
  "title": "Carte des cultures agricoles en France",
  "input": { "filePath": "base.csv", "provider": "csv", "delimiter": ";" },
  "geocoder": { "country": "FR", "referencePath": "FR.txt" },
  "departments": { "timeoutSeconds": 10 },
  "map": { "opacity": 0.5, "markerSize": 8, "zoom": 4 },
  "charts": { "variables": ["TYPO_CULTURE", "DEPARTEMENT"], "metric": "count", "maxItems": 10 },
  "cultureFilter": null,
  "output": { "outputPath": "dashboard.json", "htmlPath": "dashboard.html" }
}
```

The `version` field controls which sections are produced:
1. the map of the records
2. the pie and bar charts for each variable
3. the culture filter
4. the map of the departments

The metric is either `count` (`Nb. d'enregistrements`) or `distinct`
(`Nb. de cultures distinctes`). The number of items displayed in the charts cannot exceed the
number of distinct values of the variable.

Options given on the command line take precedence over the configuration file.

 */
