//! Open Location Code ("plus code") encoding of coordinates into grid cells.
//!
//! Only the pair section (up to 10 digits) is supported, which is all the
//! visit counting needs: an 8-digit code names a cell of 1/400 degree.

const ALPHABET: &[u8; 20] = b"23456789CFGHJMPQRVWX";
const SEPARATOR: char = '+';
const SEPARATOR_POSITION: usize = 8;
const PADDING: char = '0';
const MAX_PAIR_LENGTH: usize = 10;

// Integer precision of a full code, per axis. The pair section is recovered
// by dividing out the grid refinement (5^5 rows, 4^5 columns).
const FINAL_LAT_PRECISION: f64 = 25_000_000.0;
const FINAL_LNG_PRECISION: f64 = 8_192_000.0;
const GRID_LAT_FULL: i64 = 3_125;
const GRID_LNG_FULL: i64 = 1_024;

/// Encodes a coordinate in degrees into a plus code of `code_length` digits.
///
/// Returns `None` for non-finite coordinates or a length that is not an even
/// number in `2..=10`. Codes shorter than 8 digits are zero-padded.
pub fn encode(latitude: f64, longitude: f64, code_length: usize) -> Option<String> {
    if !latitude.is_finite() || !longitude.is_finite() || !is_supported_length(code_length) {
        return None;
    }

    let mut latitude = latitude.clamp(-90.0, 90.0);
    let longitude = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    // The north pole belongs to the cell below it.
    if latitude == 90.0 {
        latitude -= latitude_precision(code_length);
    }

    let mut lat_val = to_integer(latitude + 90.0, FINAL_LAT_PRECISION) / GRID_LAT_FULL;
    let mut lng_val = to_integer(longitude + 180.0, FINAL_LNG_PRECISION) / GRID_LNG_FULL;

    let mut digits = [0u8; MAX_PAIR_LENGTH];
    for pair in (0..MAX_PAIR_LENGTH / 2).rev() {
        digits[pair * 2] = ALPHABET[(lat_val % 20) as usize];
        digits[pair * 2 + 1] = ALPHABET[(lng_val % 20) as usize];
        lat_val /= 20;
        lng_val /= 20;
    }

    let mut code = String::with_capacity(SEPARATOR_POSITION + 3);
    code.extend(digits[..code_length.min(SEPARATOR_POSITION)].iter().map(|&d| d as char));
    for _ in code_length..SEPARATOR_POSITION {
        code.push(PADDING);
    }
    code.push(SEPARATOR);
    if code_length > SEPARATOR_POSITION {
        code.extend(digits[SEPARATOR_POSITION..code_length].iter().map(|&d| d as char));
    }
    Some(code)
}

pub fn is_supported_length(code_length: usize) -> bool {
    (2..=MAX_PAIR_LENGTH).contains(&code_length) && code_length % 2 == 0
}

/// Height in degrees of a cell with `code_length` digits.
fn latitude_precision(code_length: usize) -> f64 {
    20f64.powi(2 - (code_length / 2) as i32)
}

fn to_integer(degrees: f64, precision: f64) -> i64 {
    ((degrees * precision * 1e6).round() / 1e6).floor() as i64
}
