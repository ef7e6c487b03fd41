//! Hardware address normalization

/// Convert a Cisco formatted hardware address to a canonical MAC.
///
/// `001d.ec02.07ab` becomes `00:1D:EC:02:07:AB`. Dots are removed, the rest is
/// split into pairs left to right and joined with `:`. An odd trailing
/// character is kept as a short final chunk; malformed input is passed
/// through rather than rejected.
pub fn normalize_cisco_mac(cisco_addr: &str) -> String {
    let digits: Vec<char> = cisco_addr.chars().filter(|&c| c != '.').collect();

    digits
        .chunks(2)
        .map(|pair| pair.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(":")
        .to_uppercase()
}
