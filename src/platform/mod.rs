use os_info::Type as OsType;

/// Family tags understood by the domain catalog. `linux` is the generic
/// fallback used when no distribution-specific entry exists.
pub const FAMILIES: &[&str] = &["macos", "ubuntu", "arch", "fedora", "linux"];

pub fn detect_family() -> String {
    let info = os_info::get();
    match info.os_type() {
        OsType::Macos => "macos".to_string(),
        OsType::Ubuntu | OsType::Debian | OsType::Pop | OsType::Mint => "ubuntu".to_string(),
        OsType::Arch | OsType::Manjaro | OsType::EndeavourOS => "arch".to_string(),
        OsType::Fedora | OsType::Redhat | OsType::CentOS => "fedora".to_string(),
        _ => "linux".to_string(),
    }
}

pub fn is_linux_family(family: &str) -> bool {
    family != "macos"
}

pub fn is_known_family(family: &str) -> bool {
    FAMILIES.contains(&family)
}
