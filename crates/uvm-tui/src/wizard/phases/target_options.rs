//! Per-target settings. One logical phase; the form depends on the target.

use super::form::{self, index_of, options_with, FormEvent, FormField};
use crate::input::TextInput;
use crate::wizard::handler::{Command, FieldCount, PhaseHandler};
use crate::wizard::state::WizardState;
use crossterm::event::KeyEvent;
use std::path::PathBuf;
use uvm_core::DeploymentTarget;
use uvm_deploy::multipass::valid_instance_name;
use uvm_deploy::usb::STORAGE_LAYOUTS;

const MP_IMAGES: &[&str] = &["24.04", "22.04", "20.04", "daily"];
const CPUS: &[&str] = &["1", "2", "4", "8"];
const MP_MEMORY: &[&str] = &["1G", "2G", "4G", "8G", "16G"];
const MP_DISK: &[&str] = &["10G", "20G", "40G", "80G"];
const TF_MEMORY_MB: &[&str] = &["2048", "4096", "8192", "16384"];
const TF_DISK_GB: &[&str] = &["20", "40", "80", "160"];

pub struct TargetOptionsPhase;

impl TargetOptionsPhase {
    fn fields(state: &WizardState) -> Vec<FormField> {
        let data = &state.data;
        match data.target {
            DeploymentTarget::Multipass => vec![
                FormField::text("mp_name", "Instance name"),
                FormField::choice("mp_image", "Image", options_with(MP_IMAGES, &data.multipass.image)),
                FormField::choice(
                    "mp_cpus",
                    "CPUs",
                    options_with(CPUS, &data.multipass.cpus.to_string()),
                ),
                FormField::choice("mp_memory", "Memory", options_with(MP_MEMORY, &data.multipass.memory)),
                FormField::choice("mp_disk", "Disk", options_with(MP_DISK, &data.multipass.disk)),
                FormField::checkbox("mp_keep", "Keep on failure"),
            ],
            DeploymentTarget::Terraform => vec![
                FormField::text("tf_name", "Domain name"),
                FormField::choice(
                    "tf_cpus",
                    "vCPUs",
                    options_with(CPUS, &data.terraform.cpus.to_string()),
                ),
                FormField::choice(
                    "tf_memory",
                    "Memory (MiB)",
                    options_with(TF_MEMORY_MB, &data.terraform.memory_mb.to_string()),
                ),
                FormField::choice(
                    "tf_disk",
                    "Disk (GiB)",
                    options_with(TF_DISK_GB, &data.terraform.disk_gb.to_string()),
                ),
                FormField::text("tf_image", "Base image"),
                FormField::text("tf_uri", "libvirt URI"),
            ],
            DeploymentTarget::Usb => vec![
                FormField::text("usb_source", "Source ISO"),
                FormField::text("usb_output", "Output ISO"),
                FormField::choice(
                    "usb_layout",
                    "Storage layout",
                    options_with(STORAGE_LAYOUTS, &data.usb.storage_layout),
                ),
                FormField::text("usb_tz", "Timezone"),
            ],
            DeploymentTarget::ConfigOnly => vec![
                FormField::text("gen_dir", "Output directory"),
                FormField::checkbox("gen_cloud_init", "Write cloud-init.yaml"),
            ],
        }
    }

    fn choice(state: &WizardState, fields: &[FormField], name: &str) -> String {
        fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| form::choice_value(state, f))
            .unwrap_or_default()
    }

    fn validate(state: &WizardState) -> Result<(), String> {
        let required = |name: &str, what: &str| {
            if state.input_value(name).is_empty() {
                Err(format!("{} is required", what))
            } else {
                Ok(())
            }
        };
        match state.data.target {
            DeploymentTarget::Multipass => {
                let name = state.input_value("mp_name");
                if !valid_instance_name(&name) {
                    return Err(format!(
                        "Invalid instance name {:?}: start with a letter, use letters, digits and '-'",
                        name
                    ));
                }
                Ok(())
            }
            DeploymentTarget::Terraform => {
                required("tf_name", "Domain name")?;
                required("tf_image", "Base image path")?;
                required("tf_uri", "libvirt URI")
            }
            DeploymentTarget::Usb => {
                required("usb_source", "Source ISO path")?;
                required("usb_output", "Output ISO path")
            }
            DeploymentTarget::ConfigOnly => required("gen_dir", "Output directory"),
        }
    }
}

impl PhaseHandler for TargetOptionsPhase {
    fn name(&self) -> &'static str {
        "target-options"
    }

    fn init(&self, state: &mut WizardState) {
        let fields = Self::fields(state);
        for field in &fields {
            if let form::FieldKind::Choice(options) = &field.kind {
                let current = match field.name {
                    "mp_image" => state.data.multipass.image.clone(),
                    "mp_cpus" => state.data.multipass.cpus.to_string(),
                    "mp_memory" => state.data.multipass.memory.clone(),
                    "mp_disk" => state.data.multipass.disk.clone(),
                    "tf_cpus" => state.data.terraform.cpus.to_string(),
                    "tf_memory" => state.data.terraform.memory_mb.to_string(),
                    "tf_disk" => state.data.terraform.disk_gb.to_string(),
                    "usb_layout" => state.data.usb.storage_layout.clone(),
                    _ => String::new(),
                };
                state.set_select(field.name, index_of(options, &current));
            }
        }

        let data = state.data.clone();
        match data.target {
            DeploymentTarget::Multipass => {
                state.set_input("mp_name", TextInput::new(&data.multipass.name, "ubuntu-dev"));
                state.set_checkbox("mp_keep", data.multipass.keep_on_failure);
            }
            DeploymentTarget::Terraform => {
                state.set_input("tf_name", TextInput::new(&data.terraform.name, "ubuntu-vm"));
                state.set_input(
                    "tf_image",
                    TextInput::new(&data.terraform.image_path, "/var/lib/libvirt/images/base.img"),
                );
                state.set_input("tf_uri", TextInput::new(&data.terraform.libvirt_uri, "qemu:///system"));
            }
            DeploymentTarget::Usb => {
                state.set_input(
                    "usb_source",
                    TextInput::new(&data.usb.source_iso, "ubuntu-24.04-live-server-amd64.iso"),
                );
                state.set_input("usb_output", TextInput::new(&data.usb.output_path, "ubuntu-autoinstall.iso"));
                state.set_input("usb_tz", TextInput::new(&data.usb.timezone, "UTC"));
            }
            DeploymentTarget::ConfigOnly => {
                let dir = data.generate.output_dir.display().to_string();
                state.set_input("gen_dir", TextInput::new(&dir, "output"));
                state.set_checkbox("gen_cloud_init", data.generate.generate_cloud_init);
            }
        }
        state.focused_field = 0;
        form::sync_focus(state, &fields);
    }

    fn update(&self, state: &mut WizardState, key: KeyEvent) -> (bool, Option<Command>) {
        let fields = Self::fields(state);
        match form::update(state, &fields, key) {
            FormEvent::Submit => match Self::validate(state) {
                Ok(()) => (true, None),
                Err(msg) => {
                    state.error(msg);
                    (false, None)
                }
            },
            FormEvent::Handled => (false, None),
        }
    }

    fn view(&self, state: &WizardState) -> Vec<String> {
        let mut lines = vec![
            format!("Options for {}", state.data.target.title()),
            String::new(),
        ];
        lines.extend(form::view(state, &Self::fields(state)));
        lines
    }

    fn save(&self, state: &mut WizardState) {
        let fields = Self::fields(state);
        let choice = |name: &str| Self::choice(state, &fields, name);
        let number = |name: &str, fallback: u32| choice(name).parse().unwrap_or(fallback);

        match state.data.target {
            DeploymentTarget::Multipass => {
                let opts = uvm_core::wizard_data::MultipassOptions {
                    name: state.input_value("mp_name"),
                    image: choice("mp_image"),
                    cpus: number("mp_cpus", state.data.multipass.cpus),
                    memory: choice("mp_memory"),
                    disk: choice("mp_disk"),
                    keep_on_failure: state.checkbox("mp_keep"),
                };
                state.data.multipass = opts;
            }
            DeploymentTarget::Terraform => {
                let opts = uvm_core::wizard_data::TerraformOptions {
                    name: state.input_value("tf_name"),
                    cpus: number("tf_cpus", state.data.terraform.cpus),
                    memory_mb: number("tf_memory", state.data.terraform.memory_mb),
                    disk_gb: number("tf_disk", state.data.terraform.disk_gb),
                    image_path: state.input_value("tf_image"),
                    libvirt_uri: state.input_value("tf_uri"),
                };
                state.data.terraform = opts;
            }
            DeploymentTarget::Usb => {
                let timezone = state.input_value("usb_tz");
                let opts = uvm_core::wizard_data::UsbOptions {
                    source_iso: state.input_value("usb_source"),
                    output_path: state.input_value("usb_output"),
                    storage_layout: choice("usb_layout"),
                    timezone: if timezone.is_empty() { "UTC".to_string() } else { timezone },
                };
                state.data.usb = opts;
            }
            DeploymentTarget::ConfigOnly => {
                let opts = uvm_core::wizard_data::GenerateOptions {
                    output_dir: PathBuf::from(state.input_value("gen_dir")),
                    generate_cloud_init: state.checkbox("gen_cloud_init"),
                };
                state.data.generate = opts;
            }
        }
    }

    fn field_count(&self, state: &WizardState) -> FieldCount {
        FieldCount::Fixed(Self::fields(state).len())
    }

    fn key_help(&self) -> &'static str {
        form::FORM_HELP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::Keymap;
    use crossterm::event::{KeyCode, KeyModifiers};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state_for(target: DeploymentTarget) -> WizardState {
        let mut state = WizardState::new(None, vec![], Keymap::default());
        state.data.target = target;
        TargetOptionsPhase.init(&mut state);
        state
    }

    #[test]
    fn field_counts_per_target() {
        let counts: Vec<FieldCount> = DeploymentTarget::all()
            .iter()
            .map(|t| TargetOptionsPhase.field_count(&state_for(*t)))
            .collect();
        assert_eq!(
            counts,
            vec![
                FieldCount::Fixed(6),
                FieldCount::Fixed(6),
                FieldCount::Fixed(4),
                FieldCount::Fixed(2)
            ]
        );
    }

    #[test]
    fn multipass_choices_saved() {
        let mut state = state_for(DeploymentTarget::Multipass);
        assert!(state.editing());
        TargetOptionsPhase.update(&mut state, key(KeyCode::Tab));
        TargetOptionsPhase.update(&mut state, key(KeyCode::Tab));
        // cpus: 2 -> 4
        TargetOptionsPhase.update(&mut state, key(KeyCode::Right));
        TargetOptionsPhase.save(&mut state);
        assert_eq!(state.data.multipass.cpus, 4);
        assert_eq!(state.data.multipass.image, "24.04");
        assert_eq!(state.data.multipass.memory, "4G");
    }

    #[test]
    fn usb_requires_source_iso() {
        let mut state = state_for(DeploymentTarget::Usb);
        for _ in 0..3 {
            TargetOptionsPhase.update(&mut state, key(KeyCode::Tab));
        }
        let (advance, _) = TargetOptionsPhase.update(&mut state, key(KeyCode::Enter));
        assert!(!advance);
        assert!(state.status.is_some());
    }

    #[test]
    fn custom_terraform_values_survive_round_trip() {
        let mut state = WizardState::new(None, vec![], Keymap::default());
        state.data.target = DeploymentTarget::Terraform;
        state.data.terraform.memory_mb = 3072;
        TargetOptionsPhase.init(&mut state);
        TargetOptionsPhase.save(&mut state);
        assert_eq!(state.data.terraform.memory_mb, 3072);
    }
}
