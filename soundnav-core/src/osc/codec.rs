//! OSC 1.0 message encoding on top of `rosc`.
//!
//! Only single messages are produced; bundles are never needed by SoundNav.

use rosc::{OscPacket, OscType};
use soundnav_types::{OscArg, OscMessage};

use crate::error::{Result, SoundNavError};

/// Encode one message into a datagram payload.
pub fn encode(msg: &OscMessage) -> Result<Vec<u8>> {
    if !msg.addr.starts_with('/') {
        return Err(SoundNavError::Configuration(format!(
            "OSC address must start with '/': {:?}",
            msg.addr
        )));
    }
    let packet = OscPacket::Message(rosc::OscMessage {
        addr: msg.addr.clone(),
        args: msg.args.iter().map(arg_to_osc).collect(),
    });
    Ok(rosc::encoder::encode(&packet)?)
}

/// Decode a datagram produced by [`encode`].
pub fn decode(datagram: &[u8]) -> Result<OscMessage> {
    let (_, packet) = rosc::decoder::decode_udp(datagram)?;
    match packet {
        OscPacket::Message(msg) => {
            let args = msg
                .args
                .into_iter()
                .map(|arg| {
                    osc_to_arg(arg).ok_or_else(|| {
                        SoundNavError::Configuration("unsupported OSC argument type".to_string())
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(OscMessage { addr: msg.addr, args })
        }
        OscPacket::Bundle(_) => Err(SoundNavError::Configuration(
            "OSC bundles are not supported".to_string(),
        )),
    }
}

fn arg_to_osc(arg: &OscArg) -> OscType {
    match arg {
        OscArg::Int(v) => OscType::Int(*v),
        OscArg::Float(v) => OscType::Float(*v),
        OscArg::Str(v) => OscType::String(v.clone()),
        OscArg::Bool(v) => OscType::Bool(*v),
    }
}

fn osc_to_arg(arg: OscType) -> Option<OscArg> {
    match arg {
        OscType::Int(v) => Some(OscArg::Int(v)),
        OscType::Float(v) => Some(OscArg::Float(v)),
        OscType::String(v) => Some(OscArg::Str(v)),
        OscType::Bool(v) => Some(OscArg::Bool(v)),
        _ => None,
    }
}
