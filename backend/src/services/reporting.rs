//! Report rendering shared by the report endpoints

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

/// Output format of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    pub format: Option<ReportFormat>,
}

impl ReportQuery {
    pub fn format(&self) -> ReportFormat {
        self.format.unwrap_or_default()
    }
}

/// Serialize flat records as CSV with a header row
pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in data {
        wtr.serialize(record)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::VarianceLine;
    use uuid::Uuid;

    #[test]
    fn test_variance_lines_export_with_header() {
        let lines = vec![
            VarianceLine::new(
                Uuid::nil(),
                "Aperol".to_string(),
                Some("APE-700".to_string()),
                dec!(5),
                Some(dec!(4)),
                dec!(21.00),
            ),
            VarianceLine::new(Uuid::nil(), "Soda".to_string(), None, dec!(0), None, dec!(1.00)),
        ];
        let csv = export_to_csv(&lines).unwrap();
        let mut rows = csv.lines();

        let header = rows.next().unwrap();
        assert!(header.starts_with("product_id,product_name,sku,expected_quantity"));
        assert!(header.ends_with("value_impact"));

        let aperol: Vec<&str> = rows.next().unwrap().split(',').collect();
        assert_eq!(&aperol[1..6], &["Aperol", "APE-700", "5", "4", "-1"]);
        assert_eq!(aperol[6].parse::<rust_decimal::Decimal>().unwrap(), dec!(-20));
        assert_eq!(&aperol[7..], &["21.00", "-21.00"]);

        let soda = rows.next().unwrap();
        assert!(soda.contains("Soda,,0,,,,1.00,"));
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_report_format_defaults_to_json() {
        assert_eq!(ReportQuery::default().format(), ReportFormat::Json);
        let query: ReportQuery = serde_json::from_str(r#"{"format":"csv"}"#).unwrap();
        assert_eq!(query.format(), ReportFormat::Csv);
    }
}
