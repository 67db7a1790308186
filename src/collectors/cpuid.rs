// CPUID identification probe. Real on x86/x86_64, absent elsewhere.

/// What the instruction-level probe can offer. Everything optional; on
/// non-x86 targets the probe yields nothing at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuIdProbe {
    pub brand: Option<String>,
    pub vendor_id: Option<String>,
    pub flags: Vec<String>,
    pub l2_cache_size: Option<String>,
    pub l3_cache_size: Option<String>,
    pub hz_advertised: Option<String>,
    pub hz_actual: Option<String>,
    pub stepping: Option<String>,
    pub cache_line_size_bytes: Option<u32>,
}

/// Flag cap from the snapshot schema.
const MAX_FLAGS: usize = 64;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub fn probe() -> Option<CpuIdProbe> {
    use raw_cpuid::{CacheType, CpuId};

    fn push_flag(flags: &mut Vec<String>, present: bool, name: &str) {
        if present {
            flags.push(name.to_string());
        }
    }

    let cpuid = CpuId::new();
    let mut out = CpuIdProbe::default();

    if let Some(vendor) = cpuid.get_vendor_info() {
        let v = vendor.as_str().trim().to_string();
        if !v.is_empty() {
            out.vendor_id = Some(v);
        }
    }

    if let Some(brand) = cpuid.get_processor_brand_string() {
        let b = brand.as_str().trim().to_string();
        if !b.is_empty() {
            out.hz_advertised = parse_brand_frequency(&b);
            out.brand = Some(b);
        }
    }

    let mut flags = Vec::new();
    if let Some(f) = cpuid.get_feature_info() {
        out.stepping = Some(f.stepping_id().to_string());
        if f.has_clflush() {
            out.cache_line_size_bytes = Some(u32::from(f.cflush_cache_line_size()) * 8);
        }
        push_flag(&mut flags, f.has_fpu(), "fpu");
        push_flag(&mut flags, f.has_vme(), "vme");
        push_flag(&mut flags, f.has_de(), "de");
        push_flag(&mut flags, f.has_pse(), "pse");
        push_flag(&mut flags, f.has_tsc(), "tsc");
        push_flag(&mut flags, f.has_msr(), "msr");
        push_flag(&mut flags, f.has_pae(), "pae");
        push_flag(&mut flags, f.has_mce(), "mce");
        push_flag(&mut flags, f.has_cmpxchg8b(), "cx8");
        push_flag(&mut flags, f.has_apic(), "apic");
        push_flag(&mut flags, f.has_sysenter_sysexit(), "sep");
        push_flag(&mut flags, f.has_mtrr(), "mtrr");
        push_flag(&mut flags, f.has_pge(), "pge");
        push_flag(&mut flags, f.has_mca(), "mca");
        push_flag(&mut flags, f.has_cmov(), "cmov");
        push_flag(&mut flags, f.has_pat(), "pat");
        push_flag(&mut flags, f.has_pse36(), "pse36");
        push_flag(&mut flags, f.has_clflush(), "clflush");
        push_flag(&mut flags, f.has_mmx(), "mmx");
        push_flag(&mut flags, f.has_fxsave_fxstor(), "fxsr");
        push_flag(&mut flags, f.has_sse(), "sse");
        push_flag(&mut flags, f.has_sse2(), "sse2");
        push_flag(&mut flags, f.has_ss(), "ss");
        push_flag(&mut flags, f.has_htt(), "ht");
        push_flag(&mut flags, f.has_tm(), "tm");
        push_flag(&mut flags, f.has_sse3(), "sse3");
        push_flag(&mut flags, f.has_pclmulqdq(), "pclmulqdq");
        push_flag(&mut flags, f.has_monitor_mwait(), "monitor");
        push_flag(&mut flags, f.has_vmx(), "vmx");
        push_flag(&mut flags, f.has_ssse3(), "ssse3");
        push_flag(&mut flags, f.has_fma(), "fma");
        push_flag(&mut flags, f.has_cmpxchg16b(), "cx16");
        push_flag(&mut flags, f.has_sse41(), "sse4_1");
        push_flag(&mut flags, f.has_sse42(), "sse4_2");
        push_flag(&mut flags, f.has_x2apic(), "x2apic");
        push_flag(&mut flags, f.has_movbe(), "movbe");
        push_flag(&mut flags, f.has_popcnt(), "popcnt");
        push_flag(&mut flags, f.has_aesni(), "aes");
        push_flag(&mut flags, f.has_xsave(), "xsave");
        push_flag(&mut flags, f.has_avx(), "avx");
        push_flag(&mut flags, f.has_f16c(), "f16c");
        push_flag(&mut flags, f.has_rdrand(), "rdrand");
        push_flag(&mut flags, f.has_hypervisor(), "hypervisor");
    }
    if let Some(ef) = cpuid.get_extended_feature_info() {
        push_flag(&mut flags, ef.has_fsgsbase(), "fsgsbase");
        push_flag(&mut flags, ef.has_bmi1(), "bmi1");
        push_flag(&mut flags, ef.has_avx2(), "avx2");
        push_flag(&mut flags, ef.has_smep(), "smep");
        push_flag(&mut flags, ef.has_bmi2(), "bmi2");
        push_flag(&mut flags, ef.has_rep_movsb_stosb(), "erms");
        push_flag(&mut flags, ef.has_invpcid(), "invpcid");
        push_flag(&mut flags, ef.has_rdseed(), "rdseed");
        push_flag(&mut flags, ef.has_adx(), "adx");
        push_flag(&mut flags, ef.has_smap(), "smap");
        push_flag(&mut flags, ef.has_clflushopt(), "clflushopt");
        push_flag(&mut flags, ef.has_sha(), "sha");
        push_flag(&mut flags, ef.has_avx512f(), "avx512f");
    }
    if let Some(ext) = cpuid.get_extended_processor_and_feature_identifiers() {
        push_flag(&mut flags, ext.has_lzcnt(), "lzcnt");
        push_flag(&mut flags, ext.has_rdtscp(), "rdtscp");
        push_flag(&mut flags, ext.has_1gib_pages(), "pdpe1gb");
        push_flag(&mut flags, ext.has_64bit_mode(), "lm");
        push_flag(&mut flags, ext.has_syscall_sysret(), "syscall");
        push_flag(&mut flags, ext.has_execute_disable(), "nx");
    }
    out.flags = cap_flags(flags);

    if let Some(caches) = cpuid.get_cache_parameters() {
        for cache in caches {
            let relevant = matches!(cache.cache_type(), CacheType::Data | CacheType::Unified);
            if !relevant {
                continue;
            }
            let bytes = cache.associativity()
                * cache.physical_line_partitions()
                * cache.coherency_line_size()
                * cache.sets();
            if bytes == 0 {
                continue;
            }
            let label = format!("{} KB", bytes / 1024);
            match cache.level() {
                2 if out.l2_cache_size.is_none() => out.l2_cache_size = Some(label),
                3 if out.l3_cache_size.is_none() => out.l3_cache_size = Some(label),
                _ => {}
            }
        }
    }

    if let Some(freq) = cpuid.get_processor_frequency_info() {
        let base = freq.processor_base_frequency();
        if base > 0 {
            out.hz_actual = Some(format_ghz(f64::from(base)));
        }
    }

    if out == CpuIdProbe::default() {
        None
    } else {
        Some(out)
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub fn probe() -> Option<CpuIdProbe> {
    None
}

/// Sorted, deduplicated, capped at the schema limit.
fn cap_flags(mut flags: Vec<String>) -> Vec<String> {
    flags.sort();
    flags.dedup();
    flags.truncate(MAX_FLAGS);
    flags
}

fn format_ghz(mhz: f64) -> String {
    format!("{:.4} GHz", mhz / 1000.0)
}

/// Pull the advertised clock out of a brand string like
/// "Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz".
pub(crate) fn parse_brand_frequency(brand: &str) -> Option<String> {
    let (_, tail) = brand.rsplit_once('@')?;
    let tail = tail.trim();
    let (value, unit_scale) = if let Some(v) = tail.strip_suffix("GHz") {
        (v, 1000.0)
    } else if let Some(v) = tail.strip_suffix("MHz") {
        (v, 1.0)
    } else {
        return None;
    };
    let parsed: f64 = value.trim().parse().ok()?;
    if parsed <= 0.0 {
        return None;
    }
    Some(format_ghz(parsed * unit_scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brand_frequency_ghz() {
        assert_eq!(
            parse_brand_frequency("Intel(R) Core(TM) i7-9700K CPU @ 3.60GHz").as_deref(),
            Some("3.6000 GHz")
        );
    }

    #[test]
    fn brand_frequency_mhz_is_scaled() {
        assert_eq!(
            parse_brand_frequency("Some CPU @ 800MHz").as_deref(),
            Some("0.8000 GHz")
        );
    }

    #[test]
    fn brand_without_clock_yields_nothing() {
        assert_eq!(parse_brand_frequency("AMD EPYC 7742 64-Core Processor"), None);
    }

    #[test]
    fn flags_are_sorted_and_capped() {
        let many: Vec<String> = (0..80).map(|i| format!("flag{:02}", 79 - i)).collect();
        let capped = cap_flags(many);
        assert_eq!(capped.len(), 64);
        assert!(capped.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn flags_are_deduplicated() {
        let flags = vec!["sse".to_string(), "avx".to_string(), "sse".to_string()];
        assert_eq!(cap_flags(flags), vec!["avx".to_string(), "sse".to_string()]);
    }
}
