//! CSV loading for the weather/generation dataset.

use std::path::Path;

use chrono::{DateTime, Utc};
use polars::prelude::{CsvReader, DataFrame, DataType, SerReader, Series, TimeUnit};
use tracing::{debug, info};

use super::{Dataset, Matrix, FEATURE_COLUMNS, TARGET_COLUMNS};
use crate::error::{PipelineError, Result};

const SECONDS_PER_DAY: i64 = 86_400;

/// Read a CSV with a header row; column 0 is parsed as the timestamp index.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("dataset not found: {}", path.display()),
        )));
    }

    let df = CsvReader::from_path(path)?
        .has_header(true)
        .with_try_parse_dates(true)
        .finish()?;
    debug!(path = %path.display(), shape = ?df.shape(), "csv parsed");

    let dataset = dataset_from_frame(&df)?;
    info!(
        path = %path.display(),
        rows = dataset.len(),
        "dataset loaded"
    );
    Ok(dataset)
}

/// Convert a parsed frame into a [`Dataset`]. Columns other than the index
/// and the six required ones are ignored.
pub fn dataset_from_frame(df: &DataFrame) -> Result<Dataset> {
    let index_series = df.get_columns().first().ok_or(PipelineError::EmptyData)?;
    let index = parse_index(index_series)?;

    let columns = FEATURE_COLUMNS
        .iter()
        .chain(TARGET_COLUMNS.iter())
        .map(|name| {
            let series = df
                .column(name)
                .map_err(|_| PipelineError::MissingColumn(name.to_string()))?;
            Ok((name.to_string(), numeric_values(series)?))
        })
        .collect::<Result<Vec<_>>>()?;

    Dataset::new(index, Matrix::from_columns(columns)?)
}

fn parse_index(series: &Series) -> Result<Vec<DateTime<Utc>>> {
    let column = series.name().to_string();
    let dtype = series.dtype().clone();
    if !matches!(dtype, DataType::Datetime(_, _) | DataType::Date) {
        return Err(PipelineError::InvalidIndex {
            column,
            reason: format!("expected datetime values, found {}", dtype),
        });
    }

    let physical = series.cast(&DataType::Int64)?;
    let values = physical.i64()?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.and_then(|v| to_utc(v, &dtype))
                .ok_or_else(|| PipelineError::InvalidIndex {
                    column: column.clone(),
                    reason: format!("missing or out-of-range timestamp at row {}", row),
                })
        })
        .collect()
}

fn to_utc(value: i64, dtype: &DataType) -> Option<DateTime<Utc>> {
    match dtype {
        DataType::Datetime(TimeUnit::Nanoseconds, _) => Some(DateTime::from_timestamp_nanos(value)),
        DataType::Datetime(TimeUnit::Microseconds, _) => DateTime::from_timestamp_micros(value),
        DataType::Datetime(TimeUnit::Milliseconds, _) => DateTime::from_timestamp_millis(value),
        DataType::Date => DateTime::from_timestamp(value.checked_mul(SECONDS_PER_DAY)?, 0),
        _ => None,
    }
}

fn numeric_values(series: &Series) -> Result<Vec<f64>> {
    let column = series.name().to_string();
    if !series.dtype().is_numeric() {
        return Err(PipelineError::NonNumericColumn {
            column,
            dtype: series.dtype().to_string(),
        });
    }

    let casted = series.cast(&DataType::Float64)?;
    let values = casted.f64()?;

    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| PipelineError::MissingValue {
                column: column.clone(),
                row,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "utc_timestamp,windspeed,temperature,rad_horizontal,rad_diffuse,solar_GW,wind_GW";

    fn write_csv(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("germany.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_valid_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            &format!(
                "{HEADER}\n\
                 2016-01-01 00:00:00,3.5,-1.0,0.0,0.0,0.0,10.2\n\
                 2016-01-01 01:00:00,4.0,-1.5,0.0,0.0,0.0,11.0\n\
                 2016-01-01 12:00:00,2,4.5,120.0,80.5,5.1,7\n"
            ),
        );

        let ds = load_dataset(&path).unwrap();
        assert_eq!(ds.len(), 3);

        let expected = chrono::NaiveDate::from_ymd_opt(2016, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(ds.index()[2], expected);

        let x = ds.features().unwrap();
        assert_eq!(x.row(2), &[2.0, 4.5, 120.0, 80.5]);
        let y = ds.targets().unwrap();
        assert_eq!(y.column("wind_GW").unwrap(), vec![10.2, 11.0, 7.0]);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dataset(dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::Io(e) if e.kind() == std::io::ErrorKind::NotFound));
    }

    #[test]
    fn test_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "utc_timestamp,windspeed,temperature\n2016-01-01 00:00:00,1.0,2.0\n",
        );
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(c) if c == "rad_horizontal"));
    }

    #[test]
    fn test_index_must_be_datetime() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            &format!("{HEADER}\nnot-a-date,1,2,3,4,5,6\nalso-not,1,2,3,4,5,6\n"),
        );
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidIndex { .. }));
    }

    #[test]
    fn test_non_numeric_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            &format!("{HEADER}\n2016-01-01 00:00:00,calm,2,3,4,5,6\n"),
        );
        let err = load_dataset(&path).unwrap_err();
        assert!(matches!(err, PipelineError::NonNumericColumn { column, .. } if column == "windspeed"));
    }
}
