//! Colombian DIVIPOLA department codes.
//!
//! Provides mappings between two-digit department codes and department
//! names for the 32 departments plus the capital district.

use geostats_stats_models::AdminCode;

/// DIVIPOLA codes of the 32 departments + Bogotá D.C.
pub const DEPARTMENT_CODES: &[&str] = &[
    "05", "08", "11", "13", "15", "17", "18", "19", "20", "23", "25", "27", "41", "44", "47", "50",
    "52", "54", "63", "66", "68", "70", "73", "76", "81", "85", "86", "88", "91", "94", "95", "97",
    "99",
];

/// Maps a department code to the department name.
///
/// Returns `None` for unrecognized codes.
#[must_use]
pub const fn department_name(code: AdminCode) -> Option<&'static str> {
    Some(match code.value() {
        5 => "Antioquia",
        8 => "Atlántico",
        11 => "Bogotá D.C.",
        13 => "Bolívar",
        15 => "Boyacá",
        17 => "Caldas",
        18 => "Caquetá",
        19 => "Cauca",
        20 => "Cesar",
        23 => "Córdoba",
        25 => "Cundinamarca",
        27 => "Chocó",
        41 => "Huila",
        44 => "La Guajira",
        47 => "Magdalena",
        50 => "Meta",
        52 => "Nariño",
        54 => "Norte de Santander",
        63 => "Quindío",
        66 => "Risaralda",
        68 => "Santander",
        70 => "Sucre",
        73 => "Tolima",
        76 => "Valle del Cauca",
        81 => "Arauca",
        85 => "Casanare",
        86 => "Putumayo",
        88 => "San Andrés",
        91 => "Amazonas",
        94 => "Guainía",
        95 => "Guaviare",
        97 => "Vaupés",
        99 => "Vichada",
        _ => return None,
    })
}

/// Maps a department name to its code, ignoring case.
///
/// Returns `None` for unrecognized names.
#[must_use]
pub fn department_code(name: &str) -> Option<AdminCode> {
    let wanted = name.trim().to_lowercase();
    DEPARTMENT_CODES
        .iter()
        .filter_map(|code| code.parse::<AdminCode>().ok())
        .find(|&code| department_name(code).is_some_and(|n| n.to_lowercase() == wanted))
}
