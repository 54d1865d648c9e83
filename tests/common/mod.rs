#![allow(dead_code)]

pub mod archives {
    use std::io::{Cursor, Write};
    use std::path::{Path, PathBuf};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    /// Jar bytes whose entries all hold the same dummy class payload.
    pub fn jar_bytes(names: &[&str]) -> Vec<u8> {
        let files: Vec<(&str, Vec<u8>)> = names.iter().map(|n| (*n, b"cafebabe".to_vec())).collect();
        jar_with(&files)
    }

    /// Jar bytes with explicit entry contents.
    pub fn jar_with(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in files {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// Write `bytes` to `dir/name`, creating parent directories.
    pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// A war with `WEB-INF/classes/a/B.class` and `WEB-INF/lib/x.jar`
    /// holding `c/D.class`.
    pub fn sample_war() -> Vec<u8> {
        jar_with(&[
            ("WEB-INF/classes/a/B.class", b"cafebabe".to_vec()),
            ("WEB-INF/lib/x.jar", jar_bytes(&["c/D.class"])),
        ])
    }
}

pub mod catalogs {
    use oas_assembler::catalog::{
        InMemoryTypeCatalog, OperationInfo, ParameterIn, ParameterInfo, TypeInfo,
    };

    /// `a.B` is a `/pets` resource, `c.D` a `/things` resource from a library.
    pub fn sample_catalog() -> InMemoryTypeCatalog {
        let mut get_pet = OperationInfo::new("GET", "getPet").with_path("{id}");
        get_pet.parameters.push(ParameterInfo {
            name: "id".into(),
            location: ParameterIn::Path,
            required: true,
            schema_type: Some("integer".into()),
        });
        get_pet.produces.push("application/json".into());
        InMemoryTypeCatalog::new()
            .with_type(
                TypeInfo::resource("a.B", "/pets")
                    .with_operation(OperationInfo::new("GET", "listPets"))
                    .with_operation(get_pet),
            )
            .with_type(
                TypeInfo::resource("c.D", "/things")
                    .with_operation(OperationInfo::new("POST", "createThing")),
            )
    }
}

pub mod topologies {
    use oas_assembler::topology::{
        FixedHostResolver, NetworkListener, ServerTopologyResolver, StaticTopology,
    };
    use std::sync::Arc;

    pub const HOST: &str = "testhost";

    pub fn plain_and_secure() -> StaticTopology {
        StaticTopology {
            listeners: vec![
                NetworkListener::new("http-listener", 8080, false),
                NetworkListener::new("https-listener", 8181, true),
            ],
            ..StaticTopology::default()
        }
    }

    pub fn resolver(topology: StaticTopology) -> ServerTopologyResolver {
        ServerTopologyResolver::with_host_resolver(
            Arc::new(topology),
            Arc::new(FixedHostResolver(HOST.to_string())),
        )
    }
}
