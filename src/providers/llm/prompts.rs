//! Extraction prompt templates
//!
//! Placeholders: `{{COMPANY_NAME}}` and `{{CONTENT}}`.

pub const LEADERSHIP_PROMPT: &str = r#"You are a mining industry intelligence analyst. Extract all executives and board members for the company "{{COMPANY_NAME}}" from the following web page content.

For each person, provide:
- "name": Full name
- "title": Their role/title at the company (e.g., "CEO", "Non-Executive Director", "Chief Financial Officer")
- "expertise_tags": An array of 1-4 expertise areas from this list: Geology, Metallurgy, Mining Engineering, Finance, Corporate Governance, Environmental, Legal, Marketing, Operations, Human Resources, Technology, Exploration, Project Development, Health & Safety. Only assign tags that are clearly supported by their bio.
- "summary_bullets": Exactly 3 short bullet points (1 sentence each) focusing on their project experience, operational history, and technical accomplishments in mining/resources. If info is limited, summarize what is available.

Return ONLY a JSON array. No markdown, no explanation. Example format:
[
  {
    "name": "John Smith",
    "title": "Chief Executive Officer",
    "expertise_tags": ["Mining Engineering", "Operations", "Finance"],
    "summary_bullets": [
      "Led development of the Sunrise Gold Project from feasibility to production.",
      "Over 25 years of operational experience across gold and copper mining in Australia.",
      "Previously served as COO at Pacific Mining Ltd managing 3 operating sites."
    ]
  }
]

If no leadership/board data is found, return an empty array: []

Web page content:
{{CONTENT}}"#;

pub const ASSETS_PROMPT: &str = r#"You are a mining industry intelligence analyst with deep knowledge of global mine locations. Extract all mining assets, operations, and projects for the company "{{COMPANY_NAME}}" from the following web page content.

For each asset/mine/project, provide:
- "name": Name of the mine or project
- "commodities": Array of commodities produced (e.g., ["gold"], ["copper", "gold"], ["lithium"])
- "status": One of: "operating", "developing", "exploration", "closed", "care_and_maintenance", "unknown"
- "country": Country where the asset is located
- "state_province": State or province (if available)
- "town": Nearest town or locality (if available)
- "latitude": Geographic latitude as a decimal number. Use your knowledge of the mine's location if not stated on the page.
- "longitude": Geographic longitude as a decimal number. Use your knowledge of the mine's location if not stated on the page.

COORDINATE RULES (follow these strictly):
1. If the page gives explicit coordinates, use them.
2. If the page does not give coordinates but you know this mine (e.g., Escondida, Olympic Dam, Antamina, Jansen), use your training knowledge to provide the best approximate coordinates for the mine site.
3. If the asset is a named region or portfolio grouping (e.g., "Minerals Americas", "Queensland Coal") rather than a single mine, use the geographic centre of that region/country as coordinates.
4. Only give coordinates you are confident in. Do not guess.
5. Set latitude/longitude to null if you have absolutely no location information at all, not even a country.

EXTRACTION RULES:
- Extract EVERY asset, mine, operation, and project mentioned. Do not stop early.
- Include regional operations and portfolio groupings.

Return ONLY a JSON array. No markdown, no explanation. Example format:
[
  {
    "name": "Pilgangoora Lithium-Tantalum Project",
    "commodities": ["lithium", "tantalum"],
    "status": "operating",
    "country": "Australia",
    "state_province": "Western Australia",
    "town": "Port Hedland",
    "latitude": -21.07,
    "longitude": 118.82
  }
]

If no assets are found, return an empty array: []

Web page content:
{{CONTENT}}"#;

/// Fills a template with the company name and page content
///
/// Content is substituted last so placeholder text inside crawled pages is
/// left alone.
pub fn render_prompt(template: &str, company_name: &str, content: &str) -> String {
    template
        .replacen("{{COMPANY_NAME}}", company_name, 1)
        .replacen("{{CONTENT}}", content, 1)
}
