use std::collections::{BTreeMap, HashMap};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::core::catalog::NameCatalog;
use crate::core::error::{ResxError, ResxResult};
use crate::core::extractor::RawMapping;

/// Validated bidirectional lookup between packet type names and ids.
///
/// Only [`PacketMapBuilder`] creates one, so `by_name` and `by_id` always
/// describe the same bijection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketMap {
    by_name: HashMap<String, u32>,
    by_id: BTreeMap<u32, String>,
}

impl PacketMap {
    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// `(id, name)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.by_id.iter().map(|(id, name)| (*id, name.as_str()))
    }
}

/// Serializes to the flat object protocol libraries consume, holding both
/// directions: `{"0": "FAILURE", "FAILURE": 0, ...}`.
impl Serialize for PacketMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len() * 2))?;
        for (id, name) in self.iter() {
            map.serialize_entry(&id.to_string(), name)?;
        }
        for (id, name) in self.iter() {
            map.serialize_entry(name, &id)?;
        }
        map.end()
    }
}

/// Turns raw backend names into a [`PacketMap`] using a [`NameCatalog`].
///
/// Strict: an unknown raw name or any collision fails the whole build.
pub struct PacketMapBuilder<'a> {
    catalog: &'a NameCatalog,
}

impl<'a> PacketMapBuilder<'a> {
    pub fn new(catalog: &'a NameCatalog) -> Self {
        Self { catalog }
    }

    pub fn build(&self, mappings: &[RawMapping]) -> ResxResult<PacketMap> {
        // id -> raw name as reported, for collision messages.
        let mut raw_by_id: HashMap<u32, &str> = HashMap::with_capacity(mappings.len());
        let mut map = PacketMap::default();

        for mapping in mappings {
            let canonical = self.catalog.canonical(&mapping.raw_name).ok_or_else(|| {
                ResxError::UnmappedPacket {
                    raw_name: mapping.raw_name.clone(),
                    id: mapping.id,
                }
            })?;

            if let Some(first) = raw_by_id.get(&mapping.id) {
                if *first == mapping.raw_name {
                    continue;
                }
                return Err(ResxError::IdCollision {
                    id: mapping.id,
                    first: first.to_string(),
                    second: mapping.raw_name.clone(),
                });
            }

            if let Some(first_id) = map.by_name.get(canonical) {
                return Err(ResxError::NameCollision {
                    name: canonical.to_string(),
                    first_id: *first_id,
                    second_id: mapping.id,
                });
            }

            raw_by_id.insert(mapping.id, &mapping.raw_name);
            map.by_name.insert(canonical.to_string(), mapping.id);
            map.by_id.insert(mapping.id, canonical.to_string());
        }

        debug!("Built packet map with {} packet types", map.len());
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::extractor::scan_source;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn catalog() -> NameCatalog {
        [
            ("FAILURE", "FAILURE"),
            ("CREATE_SUCCESS", "CREATE_SUCCESS"),
            ("LOAD", "LOAD"),
            ("SHOOT_ACK", "SHOOTACK"),
            ("SHOOTACK", "SHOOTACK"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn builds_the_bidirectional_map_from_decompiled_source() {
        let source = "static const FAILURE:int = 0;\n\
                      static const CREATE_SUCCESS:int = 13;\n\
                      static const LOAD:int = 4;";
        let catalog = catalog();
        let map = PacketMapBuilder::new(&catalog)
            .build(&scan_source(source).unwrap())
            .unwrap();

        assert_eq!(
            serde_json::to_value(&map).unwrap(),
            json!({
                "0": "FAILURE",
                "13": "CREATE_SUCCESS",
                "4": "LOAD",
                "FAILURE": 0,
                "CREATE_SUCCESS": 13,
                "LOAD": 4,
            })
        );
    }

    #[test]
    fn lookups_round_trip() {
        let catalog = catalog();
        let map = PacketMapBuilder::new(&catalog)
            .build(&[
                RawMapping::new(0, "FAILURE"),
                RawMapping::new(4, "LOAD"),
                RawMapping::new(90, "SHOOT_ACK"),
            ])
            .unwrap();

        for (id, name) in map.iter() {
            assert_eq!(map.id_of(name), Some(id));
            assert_eq!(map.name_of(map.id_of(name).unwrap()), Some(name));
        }
        assert_eq!(map.name_of(90), Some("SHOOTACK"));
        assert_eq!(map.id_of("SHOOT_ACK"), None);
    }

    #[test]
    fn unknown_raw_names_fail_the_whole_build() {
        let catalog = catalog();
        let err = PacketMapBuilder::new(&catalog)
            .build(&[RawMapping::new(0, "FAILURE"), RawMapping::new(99, "MYSTERY")])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Mapping);
        match err {
            ResxError::UnmappedPacket { raw_name, id } => {
                assert_eq!(raw_name, "MYSTERY");
                assert_eq!(id, 99);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn shared_ids_collide() {
        let catalog = catalog();
        let err = PacketMapBuilder::new(&catalog)
            .build(&[RawMapping::new(4, "LOAD"), RawMapping::new(4, "FAILURE")])
            .unwrap_err();
        assert!(matches!(err, ResxError::IdCollision { id: 4, .. }));
    }

    #[test]
    fn aliases_with_different_ids_collide() {
        let catalog = catalog();
        let err = PacketMapBuilder::new(&catalog)
            .build(&[RawMapping::new(1, "SHOOTACK"), RawMapping::new(2, "SHOOT_ACK")])
            .unwrap_err();
        match err {
            ResxError::NameCollision {
                name,
                first_id,
                second_id,
            } => {
                assert_eq!(name, "SHOOTACK");
                assert_eq!((first_id, second_id), (1, 2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn exact_duplicates_are_harmless() {
        let catalog = catalog();
        let map = PacketMapBuilder::new(&catalog)
            .build(&[RawMapping::new(4, "LOAD"), RawMapping::new(4, "LOAD")])
            .unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn empty_input_gives_an_empty_map() {
        let catalog = NameCatalog::default();
        assert!(PacketMapBuilder::new(&catalog).build(&[]).unwrap().is_empty());
    }
}
