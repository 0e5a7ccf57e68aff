use super::ResearchConfig;

/// Required output shape, spelled out field by field. The model is told to
/// return this single JSON object and nothing else.
const OUTPUT_CONTRACT: &str = r#"OUTPUT FORMAT:
You must return a single valid JSON object.
DO NOT wrap the output in markdown code blocks (like ```json).
DO NOT include any text outside the JSON object.

The JSON structure must be exactly:
{
  "executiveSummary": "A concise high-level overview (2-3 paragraphs).",
  "regionalAnalysis": [
    {
      "region": "Region Name",
      "content": "Detailed analysis for this region.",
      "stats": [ {"label": "Import Vol", "value": "1.2M Tons"} ]
    }
  ],
  "productBreakdown": "Analysis of specific product categories selected.",
  "trends": "Temporal trends, seasonality, growth rates.",
  "opportunities": "Strategic recommendations and market gaps.",
  "chartData": [
    { "name": "Q1 2024", "Import": 1200, "Export": 900 }
  ],
  "tradeData": [
    {
      "date": "2024-03-15",
      "hsCode": "3901.10",
      "description": "Polyethylene granulate",
      "destination": "Rotterdam, Netherlands",
      "portOfLoading": "Jebel Ali, UAE",
      "unit": "Tons",
      "quantity": 500,
      "totalValueUSD": 450000,
      "pricePerUnitUSD": 900,
      "sourceUrl": "https://example.com/shipment-records"
    }
  ]
}"#;

/// Render a research configuration into the instruction prompt sent to
/// the model. Pure string assembly over a validated config: identical
/// inputs produce byte-identical prompts.
pub fn build_prompt(config: &ResearchConfig) -> String {
    let regions = config
        .regions
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let industries = config
        .industries
        .iter()
        .map(|i| i.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let urls = if config.urls.is_empty() {
        "None provided.".to_string()
    } else {
        config.urls.join("\n")
    };

    let mut prompt = String::new();
    prompt.push_str(
        "You are an expert trade analyst specializing in chemical products import/export research.\n",
    );
    prompt.push_str("Conduct a deep research analysis based on the following parameters:\n\n");
    prompt.push_str(&format!("CONTEXT: {}\n\n", config.context));
    prompt.push_str(&format!("TARGET REGIONS: {regions}\n\n"));
    prompt.push_str(&format!("INDUSTRY FOCUS: {industries}\n\n"));
    prompt.push_str(
        "REFERENCE URLS (Prioritize searching for info related to these domains if applicable, \
         but do not limit the research to them):\n",
    );
    prompt.push_str(&format!("{urls}\n\n"));
    prompt.push_str(&format!("RESEARCH DEPTH: {}\n\n", config.depth.as_str()));
    prompt.push_str(
        "OBJECTIVES:\n\
         1. Analyze import/export volumes and trends for the selected industries in the target regions.\n\
         2. Identify key trading partners, routes, and logistical bottlenecks.\n\
         3. Assess market opportunities and risks.\n\
         4. Provide quantitative data wherever possible (volumes, YoY growth, prices).\n\
         5. Generate a dataset for visualizing the findings over the last 4-6 time periods (quarters or years).\n\n",
    );
    prompt.push_str(
        "RAW TRADE DATA:\n\
         Extract real transactional or aggregated trade data rows for the selected industries and regions.\n\
         - Use ONLY data found through the search tool. NEVER invent \"realistic\" figures.\n\
         - If row-level shipment data is unavailable, fall back to the best available aggregated \
         statistics (per country, per port, or per period).\n\
         - Use \"N/A\" for any field you cannot determine.\n\
         - Use the standard HS code for the product category when the source does not state one.\n\
         - Attach the source URL to every extracted row.\n\n",
    );
    prompt.push_str(OUTPUT_CONTRACT);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Industry, Region, ResearchDepth};

    fn sample_config() -> ResearchConfig {
        ResearchConfig {
            urls: vec![
                "https://comtrade.un.org".to_string(),
                "https://ec.europa.eu/eurostat".to_string(),
            ],
            context: "Polyethylene flows into northern Europe".to_string(),
            regions: vec![Region::Europe, Region::MediterraneanSea],
            industries: vec![Industry::PlasticProducts],
            depth: ResearchDepth::Comprehensive,
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let config = sample_config();
        assert_eq!(build_prompt(&config), build_prompt(&config));
    }

    #[test]
    fn test_prompt_embeds_config_verbatim() {
        let prompt = build_prompt(&sample_config());
        assert!(prompt.contains("CONTEXT: Polyethylene flows into northern Europe"));
        assert!(prompt.contains("TARGET REGIONS: Europe, Mediterranean Sea"));
        assert!(prompt.contains("INDUSTRY FOCUS: Plastic Products"));
        assert!(prompt.contains("RESEARCH DEPTH: Comprehensive"));
        assert!(prompt.contains("https://comtrade.un.org\nhttps://ec.europa.eu/eurostat"));
    }

    #[test]
    fn test_prompt_without_urls() {
        let config = ResearchConfig {
            urls: vec![],
            ..sample_config()
        };
        let prompt = build_prompt(&config);
        assert!(prompt.contains("None provided."));
    }

    #[test]
    fn test_prompt_lists_objectives_and_time_series() {
        let prompt = build_prompt(&sample_config());
        assert!(prompt.contains("logistical bottlenecks"));
        assert!(prompt.contains("market opportunities and risks"));
        assert!(prompt.contains("last 4-6 time periods"));
    }

    #[test]
    fn test_prompt_forbids_fabricated_trade_data() {
        let prompt = build_prompt(&sample_config());
        assert!(prompt.contains("NEVER invent \"realistic\" figures"));
        assert!(prompt.contains("best available aggregated"));
        assert!(prompt.contains("Use \"N/A\""));
        assert!(prompt.contains("standard HS code"));
        assert!(prompt.contains("Attach the source URL to every extracted row"));
    }

    #[test]
    fn test_prompt_spells_out_output_shape() {
        let prompt = build_prompt(&sample_config());
        for field in [
            "\"executiveSummary\"",
            "\"regionalAnalysis\"",
            "\"productBreakdown\"",
            "\"trends\"",
            "\"opportunities\"",
            "\"chartData\"",
            "\"tradeData\"",
            "\"pricePerUnitUSD\"",
            "\"sourceUrl\"",
        ] {
            assert!(prompt.contains(field), "prompt must describe {field}");
        }
        assert!(prompt.contains("DO NOT include any text outside the JSON object."));
    }
}
