//! The set of device kinds the terminal transports know how to drive.
//!
//! Names follow the `vendor_os` convention used across network automation
//! tooling. Every kind reachable over telnet has an explicit `_telnet` entry;
//! the connection builder derives those names and the facade rejects a derived
//! name that is not listed here.

/// Suffix appended to a kind to select its telnet driver.
pub const TELNET_SUFFIX: &str = "_telnet";

/// Kinds driven over SSH.
pub const TERMINAL_KINDS: &[&str] = &[
    "a10",
    "accedian",
    "adtran_os",
    "alcatel_aos",
    "alcatel_sros",
    "allied_telesis_awplus",
    "apresia_aeos",
    "arista_eos",
    "aruba_os",
    "aruba_osswitch",
    "aruba_procurve",
    "avaya_ers",
    "avaya_vsp",
    "broadcom_icos",
    "brocade_fastiron",
    "brocade_fos",
    "brocade_netiron",
    "brocade_nos",
    "brocade_vdx",
    "calix_b6",
    "cdot_cros",
    "centec_os",
    "checkpoint_gaia",
    "ciena_saos",
    "cisco_asa",
    "cisco_ftd",
    "cisco_ios",
    "cisco_nxos",
    "cisco_s300",
    "cisco_tp",
    "cisco_viptela",
    "cisco_wlc",
    "cisco_xe",
    "cisco_xr",
    "cloudgenix_ion",
    "coriant",
    "dell_dnos9",
    "dell_force10",
    "dell_os10",
    "dell_os6",
    "dell_os9",
    "dell_powerconnect",
    "dlink_ds",
    "eltex",
    "endace",
    "enterasys",
    "ericsson_ipos",
    "extreme",
    "extreme_ers",
    "extreme_exos",
    "extreme_netiron",
    "extreme_nos",
    "extreme_slx",
    "extreme_vdx",
    "extreme_vsp",
    "extreme_wing",
    "f5_linux",
    "f5_ltm",
    "f5_tmsh",
    "flexvnf",
    "fortinet",
    "generic",
    "generic_termserver",
    "hp_comware",
    "hp_procurve",
    "huawei",
    "huawei_olt",
    "huawei_smartax",
    "huawei_vrpv8",
    "ipinfusion_ocnos",
    "juniper",
    "juniper_junos",
    "juniper_screenos",
    "keymile",
    "keymile_nos",
    "linux",
    "mellanox",
    "mellanox_mlnxos",
    "mikrotik_routeros",
    "mikrotik_switchos",
    "mrv_lx",
    "mrv_optiswitch",
    "netapp_cdot",
    "netgear_prosafe",
    "netscaler",
    "nokia_srl",
    "nokia_sros",
    "oneaccess_oneos",
    "optilink_eoc",
    "ovs_linux",
    "paloalto_panos",
    "pluribus",
    "quanta_mesh",
    "rad_etx",
    "raisecom_roap",
    "ruckus_fastiron",
    "ruijie_os",
    "sixwind_os",
    "sophos_sfos",
    "supermicro_smis",
    "tplink_jetstream",
    "ubiquiti_edge",
    "ubiquiti_edgerouter",
    "ubiquiti_edgeswitch",
    "ubiquiti_unifiswitch",
    "vyatta_vyos",
    "vyos",
    "watchguard_fireware",
    "yamaha",
    "zte_zxros",
    "zyxel_os",
];

/// Kinds driven over telnet.
pub const TELNET_KINDS: &[&str] = &[
    "adtran_os_telnet",
    "apresia_aeos_telnet",
    "arista_eos_telnet",
    "aruba_procurve_telnet",
    "brocade_fastiron_telnet",
    "brocade_netiron_telnet",
    "calix_b6_telnet",
    "centec_os_telnet",
    "ciena_saos_telnet",
    "cisco_ios_telnet",
    "cisco_s300_telnet",
    "cisco_xr_telnet",
    "dell_dnos6_telnet",
    "dell_powerconnect_telnet",
    "dlink_ds_telnet",
    "extreme_exos_telnet",
    "extreme_netiron_telnet",
    "extreme_telnet",
    "generic_telnet",
    "generic_termserver_telnet",
    "hp_comware_telnet",
    "hp_procurve_telnet",
    "huawei_olt_telnet",
    "huawei_telnet",
    "ipinfusion_ocnos_telnet",
    "juniper_junos_telnet",
    "nokia_sros_telnet",
    "oneaccess_oneos_telnet",
    "optilink_eoc_telnet",
    "paloalto_panos_telnet",
    "rad_etx_telnet",
    "raisecom_telnet",
    "ruckus_fastiron_telnet",
    "ruijie_os_telnet",
    "supermicro_smis_telnet",
    "tplink_jetstream_telnet",
    "yamaha_telnet",
    "zte_zxros_telnet",
];

/// Whether `kind` is a member of the supported set.
pub fn is_supported(kind: &str) -> bool {
    TERMINAL_KINDS.contains(&kind) || TELNET_KINDS.contains(&kind)
}

/// Whether `kind` names a telnet driver.
pub fn is_telnet(kind: &str) -> bool {
    kind.ends_with(TELNET_SUFFIX)
}

/// Strip the telnet suffix, leaving the platform family name.
pub fn base_kind(kind: &str) -> &str {
    kind.strip_suffix(TELNET_SUFFIX).unwrap_or(kind)
}

/// Iterate every supported kind, terminal kinds first.
pub fn all() -> impl Iterator<Item = &'static str> {
    TERMINAL_KINDS.iter().chain(TELNET_KINDS).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_telnet_kind_has_suffix() {
        assert!(TELNET_KINDS.iter().all(|k| is_telnet(k)));
        assert!(!TERMINAL_KINDS.iter().any(|k| is_telnet(k)));
    }

    #[test]
    fn test_lists_are_sorted_and_unique() {
        for list in [TERMINAL_KINDS, TELNET_KINDS] {
            let mut sorted = list.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted, list);
        }
    }

    #[test]
    fn test_membership() {
        assert!(is_supported("cisco_ios"));
        assert!(is_supported("cisco_ios_telnet"));
        assert!(is_supported("linux"));
        assert!(!is_supported("unknown"));
        assert!(!is_supported("Cisco_IOS"));
        assert!(!is_supported(""));
    }

    #[test]
    fn test_base_kind() {
        assert_eq!(base_kind("hp_comware_telnet"), "hp_comware");
        assert_eq!(base_kind("juniper_junos"), "juniper_junos");
    }
}
