//! In-memory post-processing of search results: filter, sort, slice.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use crate::device::Device;
use crate::filter::Expr;
use crate::selector::Slice;
use crate::store::Indexable;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Machine,
    User,
    Os,
    Version,
    LastSeen,
}

impl SortField {
    fn compare(self, a: &Device, b: &Device) -> Ordering {
        match self {
            Self::Machine => a.name.cmp(&b.name),
            Self::User => a.user.cmp(&b.user),
            Self::Os => a.os.cmp(&b.os),
            Self::Version => a.version().cmp(b.version()),
            Self::LastSeen => a.last_seen.cmp(&b.last_seen),
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "machine" | "name" => Ok(Self::Machine),
            "user" | "email" => Ok(Self::User),
            "os" => Ok(Self::Os),
            "version" => Ok(Self::Version),
            "lastseen" => Ok(Self::LastSeen),
            other => Err(Error::Config(format!("unknown sort field: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One key of a multi-key sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: Direction,
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = match self.field {
            SortField::Machine => "machine",
            SortField::User => "user",
            SortField::Os => "os",
            SortField::Version => "version",
            SortField::LastSeen => "lastseen",
        };
        let dir = match self.direction {
            Direction::Ascending => "asc",
            Direction::Descending => "dsc",
        };
        write!(f, "{}:{}", field, dir)
    }
}

/// Parse `user,machine:dsc` style sort orders. Direction defaults to
/// ascending; empty segments are ignored.
pub fn parse_sort(input: &str) -> Result<Vec<SortSpec>> {
    let mut specs = Vec::new();

    for part in input.split(',') {
        let part = part.trim().to_lowercase();
        if part.is_empty() {
            continue;
        }

        let (field, direction) = match part.split_once(':') {
            Some((field, "asc")) => (field, Direction::Ascending),
            Some((field, "dsc")) => (field, Direction::Descending),
            Some((_, other)) => {
                return Err(Error::Config(format!("unknown sort direction: {}", other)));
            }
            None => (part.as_str(), Direction::Ascending),
        };
        specs.push(SortSpec {
            field: field.trim().parse()?,
            direction,
        });
    }

    Ok(specs)
}

/// Stable multi-key sort; later keys break ties of earlier ones.
pub fn sort_devices(devices: &mut [Device], specs: &[SortSpec]) {
    if specs.is_empty() {
        return;
    }
    devices.sort_by(|a, b| {
        specs
            .iter()
            .map(|spec| match spec.direction {
                Direction::Ascending => spec.field.compare(a, b),
                Direction::Descending => spec.field.compare(b, a),
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

/// Keep devices whose attribute set satisfies `filter`. No filter keeps
/// everything.
pub fn apply_filter(devices: Vec<Device>, filter: Option<&Expr>) -> Vec<Device> {
    match filter {
        Some(expr) => devices
            .into_iter()
            .filter(|d| expr.eval(&d.attributes()))
            .collect(),
        None => devices,
    }
}

/// Drop repeated keys, keeping the first occurrence.
pub fn dedup_by_key<T: Indexable>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.key().to_string()))
        .collect()
}

/// Everything applied to results after they leave the index.
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub filter: Option<Expr>,
    pub sort: Vec<SortSpec>,
    pub slice: Option<Slice>,
}

/// Filter, then sort, then slice.
pub fn process(devices: Vec<Device>, options: &ProcessOptions) -> Vec<Device> {
    let mut devices = apply_filter(devices, options.filter.as_ref());
    sort_devices(&mut devices, &options.sort);

    match options.slice {
        Some(slice) if slice.is_defined() => slice.apply(&devices).to_vec(),
        _ => devices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::EnrichedInfo;
    use crate::filter::parse_filter;
    use chrono::{TimeZone, Utc};

    fn device(
        name: &str,
        user: &str,
        tags: &[&str],
        address: &str,
        os: &str,
        version: &str,
    ) -> Device {
        Device {
            name: name.to_string(),
            user: user.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            addresses: vec![address.to_string()],
            os: os.to_string(),
            client_version: version.to_string(),
            ..Device::default()
        }
    }

    fn fleet() -> Vec<Device> {
        let mut exit = device(
            "d.example.ts.net",
            "user@gmail.com",
            &["voo", "foo", "var", "vaz"],
            "127.0.0.4",
            "bigmacos",
            "1.23.1-deadbeef",
        );
        exit.enriched_info = Some(EnrichedInfo {
            has_exit_node_option: true,
            ..EnrichedInfo::default()
        });

        vec![
            device(
                "a.example.ts.net",
                "user@gmail.com",
                &["foo", "bar", "baz"],
                "127.0.0.1",
                "rasbarbarian",
                "1.23.45-deadbeef",
            ),
            device(
                "b.example.ts.net",
                "user@gmail.com",
                &["foo", "biz", "bang"],
                "127.0.0.2",
                "loonix",
                "1.23.46-deadbeef",
            ),
            device(
                "c.example.ts.net",
                "user@gmail.com",
                &["poo", "par", "paz"],
                "127.0.0.3",
                "windoze",
                "1.23.2-deadbeef",
            ),
            exit,
        ]
    }

    fn filtered(filter: &str) -> usize {
        let expr = parse_filter(filter).unwrap();
        apply_filter(fleet(), expr.as_ref()).len()
    }

    fn names(devices: &[Device]) -> Vec<&str> {
        devices.iter().map(|d| d.short_name()).collect()
    }

    #[test]
    fn test_apply_filter() {
        assert_eq!(filtered("user@gmail.com"), 4);
        assert_eq!(filtered("foo"), 3);
        assert_eq!(filtered("127.0.0.4"), 1);
        assert_eq!(filtered("(windoze | loonix)"), 2);
        assert_eq!(filtered("1.23.4*"), 2);
        assert_eq!(filtered("+exit"), 1);
        assert_eq!(filtered("-exit"), 3);
        assert_eq!(filtered("foo, ! +exit"), 2);
        assert_eq!(filtered(""), 4);
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        assert_eq!(filtered("WINDOZE"), 1);
        assert_eq!(filtered("User@Gmail.com"), 4);
    }

    #[test]
    fn test_parse_sort() {
        let specs = parse_sort("user, machine:dsc,,LastSeen:asc").unwrap();
        assert_eq!(
            specs,
            vec![
                SortSpec { field: SortField::User, direction: Direction::Ascending },
                SortSpec { field: SortField::Machine, direction: Direction::Descending },
                SortSpec { field: SortField::LastSeen, direction: Direction::Ascending },
            ]
        );
        assert_eq!(specs[1].to_string(), "machine:dsc");
        assert_eq!(parse_sort("email:asc").unwrap()[0].field, SortField::User);
        assert_eq!(parse_sort("name").unwrap()[0].field, SortField::Machine);
        assert!(parse_sort("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_sort_rejects_unknown() {
        assert!(matches!(parse_sort("colour"), Err(Error::Config(_))));
        assert!(matches!(parse_sort("user:sideways"), Err(Error::Config(_))));
    }

    #[test]
    fn test_sort_is_stable_and_multi_key() {
        let mut devices = vec![
            device("b", "y", &[], "", "", ""),
            device("a", "x", &[], "", "", ""),
            device("c", "x", &[], "", "", ""),
            device("d", "y", &[], "", "", ""),
        ];

        sort_devices(&mut devices, &parse_sort("user").unwrap());
        assert_eq!(names(&devices), vec!["a", "c", "b", "d"]);

        sort_devices(&mut devices, &parse_sort("user:dsc,machine:dsc").unwrap());
        assert_eq!(names(&devices), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_sort_by_last_seen() {
        let mut devices = fleet();
        for (i, d) in devices.iter_mut().enumerate() {
            d.last_seen = Some(Utc.with_ymd_and_hms(2024, 1, 4 - i as u32, 0, 0, 0).unwrap());
        }
        devices[2].last_seen = None;

        sort_devices(&mut devices, &parse_sort("lastseen").unwrap());
        assert_eq!(names(&devices), vec!["c", "d", "b", "a"]);
    }

    #[test]
    fn test_process_filters_sorts_then_slices() {
        let options = ProcessOptions {
            filter: parse_filter("foo").unwrap(),
            sort: parse_sort("machine:dsc").unwrap(),
            slice: Some(Slice::new(Some(0), Some(2))),
        };

        let out = process(fleet(), &options);
        assert_eq!(names(&out), vec!["d", "b"]);
    }

    #[test]
    fn test_process_slice_clamps() {
        let options = ProcessOptions {
            slice: Some(Slice::new(Some(0), Some(50))),
            ..ProcessOptions::default()
        };
        assert_eq!(process(fleet()[..2].to_vec(), &options).len(), 2);

        let options = ProcessOptions {
            slice: Some(Slice::new(Some(3), Some(1))),
            ..ProcessOptions::default()
        };
        assert!(process(fleet(), &options).is_empty());

        let options = ProcessOptions {
            slice: Some(Slice::new(None, None)),
            ..ProcessOptions::default()
        };
        assert_eq!(process(fleet(), &options).len(), 4);
    }

    #[test]
    fn test_dedup_by_key() {
        let mut devices = fleet();
        devices.push(devices[0].clone());
        devices.insert(1, devices[2].clone());

        let deduped = dedup_by_key(devices);
        assert_eq!(names(&deduped), vec!["a", "c", "b", "d"]);
    }
}
