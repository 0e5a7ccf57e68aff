use super::normalize::TradeRecord;

const HEADERS: [&str; 10] = [
    "Date",
    "HS Code",
    "Description",
    "Destination",
    "Port of Loading",
    "Unit",
    "Quantity",
    "Total Value (USD)",
    "Price Per Unit (USD)",
    "Source URL",
];

/// Render trade rows as CSV with the fixed export columns. Every data
/// field is quoted; embedded quotes are doubled.
pub fn trade_data_csv(rows: &[TradeRecord]) -> String {
    let mut out = HEADERS.join(",");

    for row in rows {
        let fields = [
            row.date.clone(),
            row.hs_code.clone(),
            row.description.clone(),
            row.destination.clone(),
            row.port_of_loading.clone(),
            row.unit.clone(),
            format_number(row.quantity),
            format_number(row.total_value_usd),
            format_number(row.price_per_unit_usd),
            row.source_url.clone().unwrap_or_default(),
        ];

        out.push('\n');
        out.push_str(
            &fields
                .iter()
                .map(|field| quote(field))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn format_number(value: f64) -> String {
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> TradeRecord {
        TradeRecord {
            date: "2024-03-15".to_string(),
            hs_code: "3901.10".to_string(),
            description: "Polyethylene granulate".to_string(),
            destination: "Rotterdam, Netherlands".to_string(),
            port_of_loading: "Jebel Ali".to_string(),
            unit: "Tons".to_string(),
            quantity: 500.0,
            total_value_usd: 450000.0,
            price_per_unit_usd: 42.5,
            source_url: Some("https://example.com".to_string()),
        }
    }

    #[test]
    fn test_header_row() {
        let csv = trade_data_csv(&[]);
        assert_eq!(
            csv,
            "Date,HS Code,Description,Destination,Port of Loading,Unit,Quantity,\
             Total Value (USD),Price Per Unit (USD),Source URL"
        );
    }

    #[test]
    fn test_row_fields_quoted() {
        let csv = trade_data_csv(&[sample_row()]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "\"2024-03-15\",\"3901.10\",\"Polyethylene granulate\",\
             \"Rotterdam, Netherlands\",\"Jebel Ali\",\"Tons\",\"500\",\"450000\",\"42.5\",\
             \"https://example.com\""
        );
    }

    #[test]
    fn test_missing_source_url_renders_empty() {
        let row = TradeRecord {
            source_url: None,
            ..sample_row()
        };
        let csv = trade_data_csv(&[row]);
        assert!(csv.ends_with(",\"\""));
    }

    #[test]
    fn test_embedded_quotes_doubled() {
        let row = TradeRecord {
            description: "HDPE \"film grade\"".to_string(),
            ..sample_row()
        };
        let csv = trade_data_csv(&[row]);
        assert!(csv.contains("\"HDPE \"\"film grade\"\"\""));
    }
}
