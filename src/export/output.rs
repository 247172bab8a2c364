//! Rendering of exported disks for the command line

use crate::config::OutputFormat;
use crate::crd::Disk;
use crate::error::Result;

/// Render disks in the requested format.
///
/// YAML output is a multi-document stream with one document per disk, ready
/// for `kubectl apply -f -`. JSON output is a single pretty-printed array.
pub fn render(disks: &[Disk], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(disks)?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Yaml => {
            let mut out = String::new();
            for disk in disks {
                out.push_str("---\n");
                out.push_str(&serde_yaml::to_string(disk)?);
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn disks() -> Vec<Disk> {
        let mut a = Disk::new("disk-a");
        a.spec.path = "/dev/sda".into();
        let mut b = Disk::new("disk-b");
        b.spec.path = "/dev/sdb".into();
        vec![a, b]
    }

    #[test]
    fn test_yaml_stream() {
        let out = render(&disks(), OutputFormat::Yaml).unwrap();
        assert_eq!(out.matches("---\n").count(), 2);
        assert!(out.contains("kind: Disk"));
        assert!(out.contains("path: /dev/sdb"));

        let docs: Vec<Disk> = serde_yaml::Deserializer::from_str(&out)
            .map(|doc| Disk::deserialize(doc).unwrap())
            .collect();
        assert_eq!(docs, disks());
    }

    #[test]
    fn test_json_array() {
        let out = render(&disks(), OutputFormat::Json).unwrap();
        let parsed: Vec<Disk> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, disks());
        assert!(out.contains("\"apiVersion\": \"openebs.io/v1alpha1\""));
    }

    #[test]
    fn test_empty() {
        assert_eq!(render(&[], OutputFormat::Yaml).unwrap(), "");
        assert_eq!(render(&[], OutputFormat::Json).unwrap(), "[]\n");
    }
}
