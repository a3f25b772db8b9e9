use crate::Map;
use rand::{distributions::Distribution, Rng};

const FALLBACK_PREFIX: &str = "policy";
const MAX_PREFIX_LEN: usize = 15;
const SUFFIX_LEN: usize = 6;

/// Derives a DNS-1123-safe policy name from the values of `labels`.
///
/// Label values are joined in key order and sanitized into a prefix of at
/// most 15 characters, followed by a random 6-character suffix. Without any
/// labels the name is `policy-<suffix>`.
pub fn generate_name<R: Rng + ?Sized>(labels: Option<&Map>, rng: &mut R) -> String {
    let labels = match labels.filter(|l| !l.is_empty()) {
        Some(labels) => labels,
        None => return format!("{FALLBACK_PREFIX}-{}", random_suffix(rng, SUFFIX_LEN)),
    };

    let joined = labels.values().map(String::as_str).collect::<Vec<_>>().join("-");
    let mut prefix = sanitize(&joined);
    if prefix.is_empty() {
        prefix = FALLBACK_PREFIX.to_string();
    }
    prefix.truncate(MAX_PREFIX_LEN);
    let prefix = prefix.trim_end_matches('-');

    format!("{prefix}-{}", random_suffix(rng, SUFFIX_LEN))
}

/// Lowercases `s`, keeps only `[a-z0-9-]` (underscores become dashes), and
/// collapses and trims runs of dashes.
fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.to_lowercase().chars() {
        let c = match c {
            'a'..='z' | '0'..='9' => c,
            '-' | '_' => '-',
            _ => continue,
        };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    out.trim_end_matches('-').to_string()
}

pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| LowercaseAlphanumeric.sample(&mut *rng) as char)
        .collect()
}

struct LowercaseAlphanumeric;

// Modified from `rand::distributions::Alphanumeric`
//
// Copyright 2018 Developers of the Rand project
// Copyright (c) 2014 The Rust Project Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
impl Distribution<u8> for LowercaseAlphanumeric {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u8 {
        const RANGE: u32 = 26 + 10;
        const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
        loop {
            let var = rng.next_u32() >> (32 - 6);
            if var < RANGE {
                return CHARSET[var as usize];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::{btreemap, convert_args};
    use rand::rngs::mock::StepRng;
    use regex::Regex;

    #[test]
    fn without_labels() {
        let mut rng = StepRng::new(0, 0);
        assert_eq!(generate_name(None, &mut rng), "policy-aaaaaa");
        assert_eq!(generate_name(Some(&Map::new()), &mut rng), "policy-aaaaaa");

        let re = Regex::new(r"^policy-[a-z0-9]{6}$").unwrap();
        let name = generate_name(None, &mut rand::thread_rng());
        assert!(re.is_match(&name), "{name}");
        assert_eq!(name.len(), 13);
    }

    #[test]
    fn replaces_underscores() {
        let labels = convert_args!(btreemap!("tenant" => "dell_computers"));
        let name = generate_name(Some(&labels), &mut StepRng::new(0, 1 << 26));
        assert_eq!(name, "dell-computers-abcdef");
        assert_eq!(name.len(), 21);
    }

    #[test]
    fn strips_invalid_characters() {
        let labels = convert_args!(btreemap!("tenant" => "Dell_Computers@123!"));
        let name = generate_name(Some(&labels), &mut StepRng::new(0, 0));
        assert_eq!(name, "dell-computers1-aaaaaa");
    }

    #[test]
    fn joins_values_in_key_order() {
        let labels = convert_args!(btreemap!("tier" => "db", "app" => "web"));
        let name = generate_name(Some(&labels), &mut StepRng::new(0, 0));
        assert_eq!(name, "web-db-aaaaaa");
    }

    #[test]
    fn trims_dashes_left_by_truncation() {
        let labels = convert_args!(btreemap!("a" => "abcdefghijklmn", "b" => "xyz"));
        let name = generate_name(Some(&labels), &mut StepRng::new(0, 0));
        assert_eq!(name, "abcdefghijklmn-aaaaaa");

        let labels = convert_args!(btreemap!("a" => "--__x__--", "b" => "!!"));
        let name = generate_name(Some(&labels), &mut StepRng::new(0, 0));
        assert_eq!(name, "x-aaaaaa");
    }

    #[test]
    fn falls_back_when_nothing_survives() {
        let labels = convert_args!(btreemap!("app" => "@@@"));
        let name = generate_name(Some(&labels), &mut StepRng::new(0, 0));
        assert_eq!(name, "policy-aaaaaa");
    }

    #[test]
    fn suffix_varies_with_rng() {
        let re = Regex::new(r"^[a-z0-9-]+-[a-z0-9]{6}$").unwrap();
        let labels = convert_args!(btreemap!("app" => "web", "env" => "prod"));

        let mut rng = StepRng::new(0, 1 << 26);
        let first = generate_name(Some(&labels), &mut rng);
        let second = generate_name(Some(&labels), &mut rng);
        assert_eq!(first, "web-prod-abcdef");
        assert_eq!(second, "web-prod-ghijkl");

        let mut rng = rand::thread_rng();
        for _ in 0..32 {
            let name = generate_name(Some(&labels), &mut rng);
            assert!(re.is_match(&name), "{name}");
            assert!(name.starts_with("web-prod-"), "{name}");
        }
    }

    #[test]
    fn redraws_outside_alphabet() {
        // Draws 36..=63 fall outside the alphabet; the step then wraps to 0.
        let mut rng = StepRng::new(36 << 26, 1 << 26);
        assert_eq!(random_suffix(&mut rng, 2), "ab");
    }
}
