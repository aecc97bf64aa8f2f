// Query intent classification
// Pure keyword/regex scanning over a static vocabulary: which device
// families a query mentions, and which of the four intent flags it raises.
// The retrieval filter turns this analysis into a chunk selection strategy.

#[cfg(test)]
mod tests;

use std::sync::LazyLock;

use fancy_regex::Regex;
use tracing::debug;

use crate::chunk::FloorLocation;

/// One device family's retrieval vocabulary.
#[derive(Debug)]
pub struct DeviceMapping {
    pub keyword: &'static str,
    pub categories: &'static [i64],
    pub visualization_types: &'static [&'static str],
    /// Coarse device-type labels this family resolves to.
    pub visualization_categories: &'static [&'static str],
    patterns: Vec<Regex>,
    key_param_patterns: Vec<Regex>,
}

impl DeviceMapping {
    fn build(
        keyword: &'static str,
        categories: &'static [i64],
        visualization_types: &'static [&'static str],
        visualization_categories: &'static [&'static str],
        patterns: &[&str],
        key_params: &[&str],
    ) -> Self {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).expect("static pattern must compile"))
            .collect();
        let key_param_patterns = key_params
            .iter()
            .map(|p| {
                Regex::new(&format!(r"(?i)\b{p}\b")).expect("static key param must compile")
            })
            .collect();
        Self {
            keyword,
            categories,
            visualization_types,
            visualization_categories,
            patterns,
            key_param_patterns,
        }
    }

    /// A family matches if the query names it literally, hits one of its
    /// regex patterns, or mentions one of its characteristic parameters as
    /// a whole word.
    fn matches(&self, lower_query: &str) -> bool {
        if lower_query.contains(self.keyword) {
            return true;
        }
        if self
            .patterns
            .iter()
            .any(|p| p.is_match(lower_query).unwrap_or(false))
        {
            return true;
        }
        self.key_param_patterns
            .iter()
            .any(|p| p.is_match(lower_query).unwrap_or(false))
    }
}

/// Static classifier configuration: device mappings plus the four intent
/// keyword lists.
#[derive(Debug)]
pub struct IntentConfig {
    pub mappings: Vec<DeviceMapping>,
    pub location_keywords: &'static [&'static str],
    pub automation_keywords: &'static [&'static str],
    pub specific_keywords: &'static [&'static str],
    pub generic_keywords: &'static [&'static str],
}

static INTENT_CONFIG: LazyLock<IntentConfig> = LazyLock::new(IntentConfig::built_in);

impl IntentConfig {
    /// The shared static configuration.
    #[inline]
    pub fn get() -> &'static Self {
        &INTENT_CONFIG
    }

    fn built_in() -> Self {
        let mappings = vec![
            DeviceMapping::build(
                "controller",
                &[0, 15],
                &["BOXIO", "WS558"],
                &["controller"],
                &[
                    "controller",
                    "box.io",
                    "dispositivo base",
                    "hub",
                    "gateway",
                    "coordinatore",
                ],
                &[
                    "abilita_connessione",
                    "firmware_version",
                    "bsp_version",
                    "mac_address",
                    "voltage",
                    "active_power",
                ],
            ),
            DeviceMapping::build(
                "thermostat",
                &[0],
                &["SMABIT_AV2010_32"],
                &["thermostat"],
                &[
                    "temperature",
                    "thermostat",
                    "termostato",
                    "temperatura",
                    "clima",
                    "riscaldamento",
                    "raffreddamento",
                    "hvac",
                    r"\bsetpoint\b",
                    r"\btemperature setting\b",
                    r"\btemperature control\b",
                ],
                &["temperatura", "setpoint", "system_mode"],
            ),
            DeviceMapping::build(
                "actuator",
                &[11],
                &["GEWISS_GWA1531"],
                &["actuator"],
                &[
                    "attuatore",
                    "actuator",
                    "gewiss",
                    "comando",
                    "window",
                    "covering",
                    r"\btapparella\b",
                    r"\bserranda\b",
                ],
                &["window_covering_percentage", "window_covering_command_up"],
            ),
            DeviceMapping::build(
                "lights",
                &[15],
                &["WS558"],
                &["smart_light"],
                &[
                    r"(?<!\w)light(?!\w)",
                    "illuminazione",
                    "lampada",
                    "luminosità",
                    "luce",
                    "luci",
                    "accensione",
                ],
                &[
                    "livello",
                    "accensione",
                    "line_1",
                    "line_2",
                    "line_3",
                ],
            ),
            DeviceMapping::build(
                "led",
                &[0, 15],
                &["LED_DRIVER"],
                &["smart_light"],
                &[r"\bled\b", r"\bled driver\b", r"\bline 1 lights\b"],
                &["accensione", "livello"],
            ),
            DeviceMapping::build(
                "energy",
                &[11],
                &["EASTRON_SDM630"],
                &["energy_meter"],
                &["energy", "power", "consumo", "watt", "volt", "elettricità"],
                &["active_power", "power_consumption", "voltage"],
            ),
            DeviceMapping::build(
                "sensor",
                &[18],
                &["VAYYAR_CARE"],
                &["sensor"],
                &[
                    "sicurezza",
                    "security",
                    "caduta",
                    r"\bfall\b",
                    "allarme",
                    "presenza",
                    "movimento",
                    "sensor",
                    "measurement",
                ],
                &["fall", "monitoraggio", "monitoring", "temperature"],
            ),
            DeviceMapping::build(
                "automation",
                &[],
                &[],
                &[],
                &[
                    "automazione",
                    "automatism",
                    "scenario",
                    "scena",
                    "automatico",
                    "trigger",
                    "condizione",
                    "quando.*allora",
                    "if.*then",
                    "se.*allora",
                    "schedulazione",
                ],
                &["switch", "button", "command"],
            ),
        ];

        Self {
            mappings,
            location_keywords: &[
                "first floor",
                "primo piano",
                "piano terra",
                "ground floor",
                "second floor",
                "secondo piano",
                "floor 1",
                "floor 2",
                "piano 1",
                "piano 2",
                "north area",
                "south area",
                "east area",
                "west area",
                "area nord",
                "area sud",
                "area est",
                "area ovest",
                "partition",
                "zona",
                "settore",
            ],
            automation_keywords: &[
                "automazione",
                "automatism",
                "scenario",
                "scena",
                "trigger",
                "schedulazione",
                "programming",
                "turn on",
                "turn off",
                "accendi",
                "spegni",
                "set temperature",
                "imposta temperatura",
                "open window",
                "close window",
                "apri finestra",
                "chiudi finestra",
                "dim lights",
                "abbassa luci",
                "increase brightness",
                "activate",
                "disattiva",
                "enable",
                "disable",
                "when temperature",
                "quando temperatura",
                "if motion",
                "se movimento",
                "after sunset",
                "dopo tramonto",
                "before sunrise",
                "prima alba",
                "schedule at",
                "programma alle",
                "execute command",
                "esegui comando",
                "run scenario",
                "avvia scenario",
                "stop automation",
                "ferma automazione",
            ],
            specific_keywords: &[
                "parameters",
                "parametri",
                "configuration",
                "configurazione",
                "setting",
                "impostazione",
                "default",
                "predefinito",
                "setpoint",
                "value",
                "valore",
                "measurement",
                "misura",
                "firmware version",
                "versione firmware",
                "software version",
                "bsp version",
                "mac address",
                "serial number",
                "device details",
                "dettagli dispositivo",
                "technical info",
                "informazioni tecniche",
                "specifications",
                "specifiche",
                "metadata",
                "properties",
                "proprietà",
                "temperature",
                "temperatura",
                "voltage",
                "tensione",
                "current",
                "corrente",
                "power",
                "potenza",
                "energy",
                "energia",
                "calibration",
                "calibrazione",
                "mode",
                "modalità",
                "command",
                "comando",
                "control",
                "controllo",
                "operation",
                "operazione",
            ],
            generic_keywords: &[
                "name",
                "nome",
                "called",
                "chiamato",
                "denominato",
                "what is",
                "come si chiama",
                "qual è il nome",
                "uuid",
                "how many",
                "quanti",
                "number",
                "numero",
                "list",
                "elenco",
                "lista",
                "show all",
                "mostra tutti",
                "type",
                "tipo",
                "category",
                "categoria",
                "kind",
                "genere",
                "describe",
                "descrivi",
                "tell me about",
                "dimmi qualcosa",
                "overview",
                "panoramica",
                "riassunto",
                "summary",
                "basic",
                "general",
                "generale",
                "devices",
                "dispositivi",
            ],
        }
    }
}

/// Result of classifying one query. Ephemeral and pure: same query, same
/// analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryAnalysis {
    /// Names of the matched device families, in vocabulary order.
    pub matched_keywords: Vec<String>,
    /// Union of the matched families' category sets, deduplicated.
    pub matched_categories: Vec<i64>,
    /// Union of the matched families' visualization types, deduplicated.
    pub matched_visualization_types: Vec<String>,
    pub is_location_query: bool,
    pub is_automation_query: bool,
    pub is_specific_query: bool,
    pub is_generic_query: bool,
    pub is_first_floor_query: bool,
    pub is_second_floor_query: bool,
    /// Set when the query names a floor literally; first floor wins if both
    /// appear.
    pub target_floor: Option<FloorLocation>,
}

/// Classify a free-text query against the static vocabulary.
#[inline]
pub fn analyze_query(query: &str) -> QueryAnalysis {
    let config = IntentConfig::get();
    let lower = query.to_lowercase();

    let mut matched_keywords = Vec::new();
    let mut matched_categories = Vec::new();
    let mut matched_visualization_types = Vec::new();

    for mapping in &config.mappings {
        if !mapping.matches(&lower) {
            continue;
        }
        matched_keywords.push(mapping.keyword.to_string());
        for category in mapping.categories {
            if !matched_categories.contains(category) {
                matched_categories.push(*category);
            }
        }
        for viz in mapping.visualization_types {
            if !matched_visualization_types.iter().any(|v| v == viz) {
                matched_visualization_types.push((*viz).to_string());
            }
        }
    }

    let contains_any = |terms: &[&str]| terms.iter().any(|term| lower.contains(term));

    let is_first_floor_query = lower.contains("first floor");
    let is_second_floor_query = lower.contains("second floor");
    let target_floor = if is_first_floor_query {
        Some(FloorLocation::First)
    } else if is_second_floor_query {
        Some(FloorLocation::Second)
    } else {
        None
    };

    let analysis = QueryAnalysis {
        matched_keywords,
        matched_categories,
        matched_visualization_types,
        is_location_query: contains_any(config.location_keywords),
        is_automation_query: contains_any(config.automation_keywords),
        is_specific_query: contains_any(config.specific_keywords),
        is_generic_query: contains_any(config.generic_keywords),
        is_first_floor_query,
        is_second_floor_query,
        target_floor,
    };

    debug!(
        "query analysis: families={:?} categories={:?} location={} automation={} specific={} generic={}",
        analysis.matched_keywords,
        analysis.matched_categories,
        analysis.is_location_query,
        analysis.is_automation_query,
        analysis.is_specific_query,
        analysis.is_generic_query
    );

    analysis
}

/// Resolve a device category code to its coarse device-type label through
/// the keyword mappings; categories no family claims are "other".
#[inline]
pub fn device_type_for_category(category: i64) -> String {
    for mapping in &IntentConfig::get().mappings {
        if mapping.categories.contains(&category) {
            return mapping
                .visualization_categories
                .first()
                .copied()
                .unwrap_or("device")
                .to_string();
        }
    }
    "other".to_string()
}
