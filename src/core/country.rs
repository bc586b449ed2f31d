//! Country code conversions needed by provider APIs.

const ALPHA3: &[(&str, &str)] = &[
    ("US", "USA"),
    ("PH", "PHL"),
    ("MA", "MAR"),
    ("FR", "FRA"),
    ("BD", "BGD"),
    ("SN", "SEN"),
    ("ES", "ESP"),
    ("IT", "ITA"),
    ("GB", "GBR"),
    ("DE", "DEU"),
    ("CA", "CAN"),
    ("AU", "AUS"),
    ("TR", "TUR"),
    ("VN", "VNM"),
    ("BE", "BEL"),
];

/// Maps an ISO-3166 alpha-2 code to alpha-3 for the supported corridors.
///
/// Unknown codes come back uppercased but otherwise unchanged. Providers
/// tolerate the alpha-2 form, so this is a known precision gap rather than
/// an error.
pub fn to_alpha3(code: &str) -> String {
    let code = code.trim().to_uppercase();
    ALPHA3
        .iter()
        .find(|(alpha2, _)| *alpha2 == code)
        .map_or(code.clone(), |(_, alpha3)| (*alpha3).to_string())
}
