//! Network member metadata (opcode 102)
//!
//! Each record describes one member's identity, its place in the command
//! hierarchy and its battle-group status. The fixed part is 104 bytes and is
//! followed by a variable list of weapon and sensor entries (4 bytes each):
//!
//! ```text
//! offset  block
//!      0  global    global id, callsign (6), callsign id, radio data (28)
//!     40  internal  mother aircraft flag, track id
//!     44  regional  hierarchy flags, display/type ids, controlling id, ctn,
//!                   baro altitude, ground speed, mach
//!     76  battle    lock states and ids, stores, weapon/sensor counts
//!    104  weapons[n] then sensors[m]
//! ```

use bytes::BufMut;
use serde::Serialize;

use super::bits::BitReader;
use super::error::FrameError;

/// Fixed part of a metadata record in bytes
pub const METADATA_FIXED_LEN: usize = 104;
/// Size of one weapon or sensor entry in bytes
pub const STORE_ENTRY_LEN: usize = 4;

const CALLSIGN_LEN: usize = 6;
const CTN_LEN: usize = 5;
const RADIO_BLOCK_LEN: usize = 28;

/// Code/value pair used for weapon and sensor inventories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreEntry {
    pub code: u8,
    pub value: u8,
}

impl StoreEntry {
    fn read(reader: &mut BitReader<'_>) -> Result<Self, FrameError> {
        let entry = Self {
            code: reader.u8()?,
            value: reader.u8()?,
        };
        reader.skip(16);
        Ok(entry)
    }

    fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.code);
        buf.put_u8(self.value);
        buf.put_u16(0);
    }
}

/// Battle-group status block
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleGroupData {
    pub is_valid: bool,
    pub q1_lock_finalization_state: u8,
    pub q2_lock_finalization_state: u8,
    pub fuel_state: u8,
    pub q1_lock_global_id: u32,
    pub q2_lock_global_id: u32,
    pub radar_lock_global_id: u32,
    pub combat_emergency: u8,
    pub chaff_remaining: u8,
    pub flare_remaining: u8,
    pub master_arm_status: u8,
    pub acs_status: u8,
    pub fuel: u8,
    pub weapons_data: Vec<StoreEntry>,
    pub sensors_data: Vec<StoreEntry>,
}

/// Identity and hierarchy metadata for one network member
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberMetadata {
    pub global_id: u32,
    pub callsign: String,
    pub callsign_id: u16,
    #[serde(rename = "isMotherAc")]
    pub is_mother_aircraft: bool,
    pub track_id: u16,
    pub is_valid: bool,
    pub role: u8,
    pub idn_tag: u8,
    #[serde(rename = "acCategory")]
    pub aircraft_category: u8,
    pub is_mission_leader: bool,
    pub is_rogue: bool,
    pub is_formation: bool,
    pub recovery_emergency: u8,
    pub display_id: u16,
    #[serde(rename = "acType")]
    pub aircraft_type: u16,
    pub bimg: u16,
    pub timg: u16,
    pub c2_critical: u8,
    /// Global id of the controlling member (0 for the root)
    #[serde(rename = "controllingNodeId")]
    pub controlling_id: u32,
    pub ctn: String,
    pub baro_altitude: i16,
    pub ground_speed: i16,
    pub mach: i16,
    pub battle_group_data: BattleGroupData,
}

impl MemberMetadata {
    /// Encoded size including the weapon and sensor tail
    pub fn encoded_len(&self) -> usize {
        let stores =
            self.battle_group_data.weapons_data.len() + self.battle_group_data.sensors_data.len();
        METADATA_FIXED_LEN + stores * STORE_ENTRY_LEN
    }

    /// Read one record, or `None` if the remaining bytes cannot hold it
    pub(crate) fn read(reader: &mut BitReader<'_>) -> Result<Option<Self>, FrameError> {
        if !reader.has_bytes(METADATA_FIXED_LEN) {
            return Ok(None);
        }

        let mut meta = Self {
            global_id: reader.u32()?,
            callsign: reader.ascii(CALLSIGN_LEN)?,
            callsign_id: reader.u16()?,
            ..Default::default()
        };
        reader.skip_bytes(RADIO_BLOCK_LEN);

        meta.is_mother_aircraft = reader.bool()?;
        meta.track_id = reader.u16()?;
        reader.skip_bytes(1);

        meta.is_valid = reader.bool()?;
        meta.role = reader.u8()?;
        meta.idn_tag = reader.u8()?;
        meta.aircraft_category = reader.u8()?;
        meta.is_mission_leader = reader.bool()?;
        meta.is_rogue = reader.bool()?;
        meta.is_formation = reader.bool()?;
        meta.recovery_emergency = reader.u8()?;
        meta.display_id = reader.u16()?;
        meta.aircraft_type = reader.u16()?;
        meta.bimg = reader.u16()?;
        meta.timg = reader.u16()?;
        meta.c2_critical = reader.u8()?;
        meta.controlling_id = u32::from(reader.u8()?);
        reader.skip_bytes(1);
        meta.ctn = reader.ascii(CTN_LEN)?;
        meta.baro_altitude = reader.i16()?;
        meta.ground_speed = reader.i16()?;
        meta.mach = reader.i16()?;
        reader.skip_bytes(2);

        let battle = &mut meta.battle_group_data;
        battle.is_valid = reader.bool()?;
        battle.q1_lock_finalization_state = reader.u8()?;
        battle.q2_lock_finalization_state = reader.u8()?;
        battle.fuel_state = reader.u8()?;
        battle.q1_lock_global_id = reader.u32()?;
        battle.q2_lock_global_id = reader.u32()?;
        battle.radar_lock_global_id = reader.u32()?;
        reader.skip_bytes(4);
        battle.combat_emergency = reader.u8()?;
        battle.chaff_remaining = reader.u8()?;
        battle.flare_remaining = reader.u8()?;
        battle.master_arm_status = reader.u8()?;
        battle.acs_status = reader.u8()?;
        battle.fuel = reader.u8()?;
        let weapons = usize::from(reader.u8()?);
        let sensors = usize::from(reader.u8()?);

        if !reader.has_bytes((weapons + sensors) * STORE_ENTRY_LEN) {
            return Ok(None);
        }
        battle.weapons_data = (0..weapons)
            .map(|_| StoreEntry::read(reader))
            .collect::<Result<_, _>>()?;
        battle.sensors_data = (0..sensors)
            .map(|_| StoreEntry::read(reader))
            .collect::<Result<_, _>>()?;

        Ok(Some(meta))
    }

    pub(crate) fn write_to<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32(self.global_id);
        put_ascii(buf, &self.callsign, CALLSIGN_LEN);
        buf.put_u16(self.callsign_id);
        buf.put_bytes(0, RADIO_BLOCK_LEN);

        buf.put_u8(u8::from(self.is_mother_aircraft));
        buf.put_u16(self.track_id);
        buf.put_u8(0);

        buf.put_u8(u8::from(self.is_valid));
        buf.put_u8(self.role);
        buf.put_u8(self.idn_tag);
        buf.put_u8(self.aircraft_category);
        buf.put_u8(u8::from(self.is_mission_leader));
        buf.put_u8(u8::from(self.is_rogue));
        buf.put_u8(u8::from(self.is_formation));
        buf.put_u8(self.recovery_emergency);
        buf.put_u16(self.display_id);
        buf.put_u16(self.aircraft_type);
        buf.put_u16(self.bimg);
        buf.put_u16(self.timg);
        buf.put_u8(self.c2_critical);
        // Controlling id travels as a single byte
        buf.put_u8((self.controlling_id & 0xFF) as u8);
        buf.put_u8(0);
        put_ascii(buf, &self.ctn, CTN_LEN);
        buf.put_i16(self.baro_altitude);
        buf.put_i16(self.ground_speed);
        buf.put_i16(self.mach);
        buf.put_u16(0);

        let battle = &self.battle_group_data;
        buf.put_u8(u8::from(battle.is_valid));
        buf.put_u8(battle.q1_lock_finalization_state);
        buf.put_u8(battle.q2_lock_finalization_state);
        buf.put_u8(battle.fuel_state);
        buf.put_u32(battle.q1_lock_global_id);
        buf.put_u32(battle.q2_lock_global_id);
        buf.put_u32(battle.radar_lock_global_id);
        buf.put_u32(0);
        buf.put_u8(battle.combat_emergency);
        buf.put_u8(battle.chaff_remaining);
        buf.put_u8(battle.flare_remaining);
        buf.put_u8(battle.master_arm_status);
        buf.put_u8(battle.acs_status);
        buf.put_u8(battle.fuel);
        buf.put_u8(battle.weapons_data.len() as u8);
        buf.put_u8(battle.sensors_data.len() as u8);
        for entry in battle.weapons_data.iter().chain(&battle.sensors_data) {
            entry.write_to(buf);
        }
    }
}

/// NUL-padded fixed-width ASCII
fn put_ascii<B: BufMut>(buf: &mut B, value: &str, len: usize) {
    let bytes = value.as_bytes();
    let n = bytes.len().min(len);
    buf.put_slice(&bytes[..n]);
    buf.put_bytes(0, len - n);
}
