//! The hook library
//!
//! One file per hook family. Each file queues its constructor registrations
//! as startup callbacks; `register_all` enqueues every family exactly once
//! and `startup::do_callbacks` drains the queue before the manager
//! materializes its registry.

mod check_expansion_cycle;
mod create_entity;
mod create_group;
mod destroy_entity;
mod destroy_group;
mod direct_groups;
mod entity_capabilities;
mod entity_keys;
mod entity_kv;
mod entity_lock;
mod fail_on_existing_entity;
mod fail_on_existing_group;
mod group_capabilities;
mod load_entity;
mod load_group;
mod manage_expansions;
mod save_entity;
mod save_group;
mod set_entity_id;
mod set_entity_meta;
mod set_entity_number;
mod set_entity_secret;
mod set_group_meta;
mod set_group_name;
mod set_group_number;
mod untyped_entity_meta;
mod untyped_group_meta;
mod validate_entity_secret;

use std::sync::Once;

static REGISTER: Once = Once::new();

/// Queue every built-in hook family for registration.
pub fn register_all() {
    REGISTER.call_once(|| {
        check_expansion_cycle::register_callbacks();
        create_entity::register_callbacks();
        create_group::register_callbacks();
        destroy_entity::register_callbacks();
        destroy_group::register_callbacks();
        direct_groups::register_callbacks();
        entity_capabilities::register_callbacks();
        entity_keys::register_callbacks();
        entity_kv::register_callbacks();
        entity_lock::register_callbacks();
        fail_on_existing_entity::register_callbacks();
        fail_on_existing_group::register_callbacks();
        group_capabilities::register_callbacks();
        load_entity::register_callbacks();
        load_group::register_callbacks();
        manage_expansions::register_callbacks();
        save_entity::register_callbacks();
        save_group::register_callbacks();
        set_entity_id::register_callbacks();
        set_entity_meta::register_callbacks();
        set_entity_number::register_callbacks();
        set_entity_secret::register_callbacks();
        set_group_meta::register_callbacks();
        set_group_name::register_callbacks();
        set_group_number::register_callbacks();
        untyped_entity_meta::register_callbacks();
        untyped_group_meta::register_callbacks();
        validate_entity_secret::register_callbacks();
    });
}
