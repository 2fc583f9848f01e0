//! Built-in vendor platforms.

pub mod arista;
pub mod aruba;
pub mod cisco;
pub mod hp;
pub mod huawei;
pub mod juniper;
pub mod linux;
pub mod nokia_sros;
pub mod paloalto;
pub mod vyos;

use crate::error::ChannelError;
use crate::platform::PlatformDefinition;

/// Constructor for one built-in family.
pub type PlatformFn = fn() -> Result<PlatformDefinition, ChannelError>;

/// Every built-in family with the device kinds that use it.
pub const BUILTIN: &[(PlatformFn, &[&str])] = &[
    (cisco::ios, &["cisco_ios", "cisco_xe"]),
    (cisco::xr, &["cisco_xr"]),
    (cisco::nxos, &["cisco_nxos"]),
    (cisco::asa, &["cisco_asa"]),
    (juniper::platform, &["juniper", "juniper_junos"]),
    (arista::platform, &["arista_eos"]),
    (hp::comware, &["hp_comware"]),
    (hp::procurve, &["hp_procurve", "aruba_procurve", "aruba_osswitch"]),
    (huawei::vrp, &["huawei"]),
    (huawei::vrpv8, &["huawei_vrpv8"]),
    (nokia_sros::platform, &["nokia_sros", "alcatel_sros"]),
    (linux::platform, &["linux"]),
    (paloalto::platform, &["paloalto_panos"]),
    (vyos::platform, &["vyos", "vyatta_vyos"]),
    (aruba::platform, &["aruba_os"]),
];
