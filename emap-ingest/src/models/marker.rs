//! Map marker category derived from the incident type label

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pictogram shown for an incident on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarkerIcon {
    #[default]
    Default,
    Fire,
    Tree,
    Traffic,
    Elevator,
    Construction,
    Animals,
    DangerousProduct,
    Blocked,
    WaterDrainage,
}

/// Keyword table, first match wins
///
/// Keywords are matched against the lowercased, accent-free label.
const KEYWORDS: &[(MarkerIcon, &[&str])] = &[
    (MarkerIcon::Fire, &["incendio", "fuego", "humo", "quema"]),
    (
        MarkerIcon::DangerousProduct,
        &["mercancias peligrosas", "producto peligroso", "productos peligrosos", "fuga de gas", "gas"],
    ),
    (MarkerIcon::Traffic, &["trafico", "vehiculo", "accidente de circulacion", "atropello"]),
    (MarkerIcon::Elevator, &["ascensor"]),
    (MarkerIcon::Tree, &["arbol", "rama", "vegetacion"]),
    (MarkerIcon::Animals, &["animal", "avispa", "abeja", "perro", "gato"]),
    (
        MarkerIcon::WaterDrainage,
        &["agua", "achique", "inundacion", "fuga", "alcantarilla"],
    ),
    (
        MarkerIcon::Construction,
        &["edificio", "fachada", "cornisa", "derrumbe", "construccion", "saneamiento", "cascotes"],
    ),
    (MarkerIcon::Blocked, &["encerrad", "apertura de puerta", "atrapad", "rescate"]),
];

impl MarkerIcon {
    /// Classify a free-text incident type label
    pub fn classify(incident_type: &str) -> Self {
        let label = normalize(incident_type);
        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| label.contains(w)))
            .map(|(icon, _)| *icon)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerIcon::Default => "DEFAULT",
            MarkerIcon::Fire => "FIRE",
            MarkerIcon::Tree => "TREE",
            MarkerIcon::Traffic => "TRAFFIC",
            MarkerIcon::Elevator => "ELEVATOR",
            MarkerIcon::Construction => "CONSTRUCTION",
            MarkerIcon::Animals => "ANIMALS",
            MarkerIcon::DangerousProduct => "DANGEROUSPRODUCT",
            MarkerIcon::Blocked => "BLOCKED",
            MarkerIcon::WaterDrainage => "WATERDRAINAGE",
        }
    }
}

impl fmt::Display for MarkerIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarkerIcon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEFAULT" => Ok(MarkerIcon::Default),
            "FIRE" => Ok(MarkerIcon::Fire),
            "TREE" => Ok(MarkerIcon::Tree),
            "TRAFFIC" => Ok(MarkerIcon::Traffic),
            "ELEVATOR" => Ok(MarkerIcon::Elevator),
            "CONSTRUCTION" => Ok(MarkerIcon::Construction),
            "ANIMALS" => Ok(MarkerIcon::Animals),
            "DANGEROUSPRODUCT" => Ok(MarkerIcon::DangerousProduct),
            "BLOCKED" => Ok(MarkerIcon::Blocked),
            "WATERDRAINAGE" => Ok(MarkerIcon::WaterDrainage),
            other => Err(format!("unknown marker icon '{}'", other)),
        }
    }
}

fn normalize(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}
