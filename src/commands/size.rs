//! `size` target: ROM usage report

use std::fs;
use std::path::Path;

use mcsflash_core::report::{parse_rom_usage, parse_size_value, RomUsage};

use super::BuildContext;

/// Read the memory report next to `firmware` and compute ROM usage
pub fn rom_usage(
    ctx: &BuildContext,
    firmware: &Path,
) -> Result<RomUsage, Box<dyn std::error::Error>> {
    let report_path = firmware.with_file_name(ctx.toolchain.memory_report_file());
    log::debug!("Calculating size from {}", report_path.display());

    let report = fs::read_to_string(&report_path).map_err(|e| {
        format!(
            "Cannot read memory report {}: {}",
            report_path.display(),
            e
        )
    })?;
    let used = parse_rom_usage(&report)?;
    let available = ctx
        .flags
        .sizes
        .as_ref()
        .and_then(|s| parse_size_value(&s.code));

    Ok(RomUsage { used, available })
}

/// Print ROM usage of `firmware`
pub fn run_size(ctx: &BuildContext, firmware: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let usage = rom_usage(ctx, firmware)?;

    match (usage.available, usage.percent()) {
        (Some(available), Some(percent)) => {
            println!(
                "ROM:   used {} bytes from {} bytes ({:.1}%)",
                usage.used, available, percent
            );
            if usage.used > available {
                log::warn!(
                    "Firmware exceeds the code size by {} bytes",
                    usage.used - available
                );
            }
        }
        _ => println!("ROM:   used {} bytes", usage.used),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use mcsflash_core::board::BoardConfig;

    fn context(root: &Path, size_code: &str) -> BuildContext {
        let board = BoardConfig::from_toml_str(&format!(
            "[build]\ncpu = \"mcs51\"\nf_cpu = \"24000000L\"\nsize_code = {}\n",
            size_code
        ))
        .unwrap();
        BuildContext::new(Project::with_base(root), board, false).unwrap()
    }

    #[test]
    fn test_rom_usage_against_code_size() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "\"0x4000\"");
        fs::create_dir_all(&ctx.project.build_dir).unwrap();
        fs::write(
            ctx.project.build_dir.join("firmware.mem"),
            "Other memory:\n   ROM/EPROM/FLASH  0x0000   0x0fff      4096    16384\n",
        )
        .unwrap();

        let usage = rom_usage(&ctx, &ctx.firmware_path()).unwrap();
        assert_eq!(usage.used, 4096);
        assert_eq!(usage.available, Some(16384));
        assert_eq!(usage.percent(), Some(25.0));
        run_size(&ctx, &ctx.firmware_path()).unwrap();
    }

    #[test]
    fn test_missing_report() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path(), "8192");
        assert!(run_size(&ctx, &ctx.firmware_path()).is_err());
    }
}
