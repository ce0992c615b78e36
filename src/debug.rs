use crate::controller::PosMov;
use crate::roaduser::Roaduser;
#[cfg(feature = "debug")]
use serde_json::json;

#[cfg(feature = "debug")]
thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

/// Records the positions a road user could reach this cycle.
#[allow(unused)]
pub fn debug_pos_movs(roaduser: &Roaduser, pos_movs: &[PosMov]) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "pos_movs",
            "roaduser": roaduser.id(),
            "lane": roaduser.lane_id(),
            "pos": roaduser.position(),
            "candidates": pos_movs,
        }))
    })
}

/// Records a road user leaving the network.
#[allow(unused)]
pub fn debug_exit(roaduser: &Roaduser, reason: &str) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "exit",
            "roaduser": roaduser.id(),
            "reason": reason,
        }))
    })
}

#[cfg(feature = "debug")]
pub fn take_debug_frame() -> serde_json::Value {
    json!(DEBUG_FRAME.with(|frame| frame.take()))
}
