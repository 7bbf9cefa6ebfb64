// ELD Trip Planner
// Copyright 2025 The eldplan Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Codec for encoded polylines at five fractional digits of precision,
//! which is what the routing upstream emits.

use crate::model::Coordinate;

/// Scale factor for five fractional digits.
const FACTOR: f64 = 100_000.0;

/// Encodes a sequence of coordinates into a polyline string.
pub fn encode(points: &[Coordinate]) -> String {
    let mut encoded = String::new();
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;
    for point in points {
        let lat = (point.lat * FACTOR).round() as i64;
        let lng = (point.lng * FACTOR).round() as i64;
        encode_value(lat - prev_lat, &mut encoded);
        encode_value(lng - prev_lng, &mut encoded);
        prev_lat = lat;
        prev_lng = lng;
    }
    encoded
}

/// Encodes a single zigzagged delta into `out`.
fn encode_value(value: i64, out: &mut String) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 } as u64;
    while value >= 0x20 {
        out.push((((value & 0x1f) | 0x20) as u8 + 63) as char);
        value >>= 5;
    }
    out.push((value as u8 + 63) as char);
}

/// Decodes a polyline string back into coordinates.  Returns `None` when the
/// input is truncated or contains bytes outside the polyline alphabet.
pub fn decode(encoded: &str) -> Option<Vec<Coordinate>> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut index = 0;
    let mut lat = 0i64;
    let mut lng = 0i64;
    while index < bytes.len() {
        lat += decode_value(bytes, &mut index)?;
        lng += decode_value(bytes, &mut index)?;
        points.push(Coordinate::new(lat as f64 / FACTOR, lng as f64 / FACTOR));
    }
    Some(points)
}

/// Decodes a single zigzagged delta starting at `index`.
fn decode_value(bytes: &[u8], index: &mut usize) -> Option<i64> {
    let mut result = 0u64;
    let mut shift = 0;
    loop {
        let byte = bytes.get(*index)?.checked_sub(63)?;
        *index += 1;
        result |= u64::from(byte & 0x1f) << shift;
        shift += 5;
        if byte < 0x20 {
            break;
        }
    }
    let result = result as i64;
    Some(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

/// Picks the point at `fraction` of the way along `points` by vertex index.
///
/// This is a labelling aid for stop snapping, not a geodesic computation, so
/// nearest-vertex resolution is enough.
pub fn point_along(points: &[Coordinate], fraction: f64) -> Option<Coordinate> {
    if points.is_empty() {
        return None;
    }
    let fraction = fraction.clamp(0.0, 1.0);
    let index = (fraction * (points.len() - 1) as f64).round() as usize;
    Some(points[index])
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference vector from the polyline format documentation.
    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn reference_points() -> Vec<Coordinate> {
        vec![
            Coordinate::new(38.5, -120.2),
            Coordinate::new(40.7, -120.95),
            Coordinate::new(43.252, -126.453),
        ]
    }

    #[test]
    fn test_encode_reference_vector() {
        assert_eq!(REFERENCE, encode(&reference_points()));
    }

    #[test]
    fn test_decode_reference_vector() {
        assert_eq!(Some(reference_points()), decode(REFERENCE));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let points = vec![
            Coordinate::new(41.8781, -87.6298),
            Coordinate::new(43.0389, -87.9065),
            Coordinate::new(43.0731, -89.4012),
            Coordinate::new(-33.86, 151.21),
        ];
        assert_eq!(Some(points.clone()), decode(&encode(&points)));
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(Some(vec![]), decode(""));
    }

    #[test]
    fn test_decode_truncated() {
        assert_eq!(None, decode("_p~iF"));
    }

    #[test]
    fn test_decode_bad_alphabet() {
        assert_eq!(None, decode("\x01\x02"));
    }

    #[test]
    fn test_point_along() {
        let points = reference_points();
        assert_eq!(Some(points[0]), point_along(&points, 0.0));
        assert_eq!(Some(points[1]), point_along(&points, 0.5));
        assert_eq!(Some(points[2]), point_along(&points, 1.0));
        assert_eq!(Some(points[2]), point_along(&points, 7.0));
        assert_eq!(None, point_along(&[], 0.5));
    }
}
