use std::collections::HashMap;

use crate::primitive::VertexInput;

use super::{BUILTIN_SHADERS, ShaderError, ShaderInterface, ShaderSource};

/// Dense handle of a registered program.
///
/// Built-ins occupy `0..BUILTIN_SHADERS.len()` in list order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

impl ShaderId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A compiled shader program: GPU module plus its source metadata.
pub struct ShaderProgram {
    id: ShaderId,
    source: ShaderSource,
    interface: ShaderInterface,
    module: wgpu::ShaderModule,
}

impl ShaderProgram {
    pub fn id(&self) -> ShaderId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }

    pub fn source(&self) -> &ShaderSource {
        &self.source
    }

    /// Bindings and vertex locations found during validation.
    pub fn interface(&self) -> &ShaderInterface {
        &self.interface
    }

    pub fn vertex_inputs(&self) -> &[VertexInput] {
        &self.source.vertex_inputs
    }

    pub fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }

    pub fn vertex_entry(&self) -> &str {
        &self.source.vertex_entry
    }

    pub fn fragment_entry(&self) -> &str {
        &self.source.fragment_entry
    }
}

/// Name-indexed, append-only table. Keeps id assignment apart from the GPU work.
#[derive(Debug)]
struct Catalog<T> {
    entries: Vec<T>,
    names: Vec<String>,
    by_name: HashMap<String, ShaderId>,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            names: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T> Catalog<T> {
    fn next_id(&self) -> ShaderId {
        ShaderId(self.entries.len() as u32)
    }

    fn check_free(&self, name: &str) -> Result<(), ShaderError> {
        if name.trim().is_empty() {
            return Err(ShaderError::EmptyName);
        }
        if self.by_name.contains_key(name) {
            return Err(ShaderError::Duplicate(name.to_string()));
        }
        Ok(())
    }

    /// Inserts under `name`; the caller must have called `check_free`.
    fn insert(&mut self, name: &str, value: T) -> ShaderId {
        let id = self.next_id();
        self.entries.push(value);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    fn id(&self, name: &str) -> Option<ShaderId> {
        self.by_name.get(name).copied()
    }

    fn get(&self, id: ShaderId) -> Option<&T> {
        self.entries.get(id.index())
    }
}

/// Registry of compiled shader programs.
///
/// Created once at startup with every built-in program compiled; callers may
/// add their own programs afterwards. Programs are never removed, so a
/// `ShaderId` stays valid for the registry's lifetime.
pub struct ShaderRegistry {
    catalog: Catalog<ShaderProgram>,
}

impl ShaderRegistry {
    /// Compiles every built-in program in `BUILTIN_SHADERS` order.
    ///
    /// Fails on the first program that does not validate or compile.
    pub fn new(device: &wgpu::Device) -> Result<Self, ShaderError> {
        let mut registry = Self::empty();
        for source in BUILTIN_SHADERS {
            registry.register(device, source.clone())?;
        }
        log::info!(
            "compiled {} built-in shader programs: {}",
            registry.len(),
            registry.names().collect::<Vec<_>>().join(", ")
        );
        Ok(registry)
    }

    /// Registry without any programs.
    pub fn empty() -> Self {
        Self {
            catalog: Catalog::default(),
        }
    }

    /// Validates, compiles and adds `source`.
    ///
    /// The registry is left unchanged on failure.
    pub fn register(
        &mut self,
        device: &wgpu::Device,
        source: ShaderSource,
    ) -> Result<ShaderId, ShaderError> {
        self.catalog.check_free(&source.name)?;
        let (module, interface) = compile(device, &source)?;

        let id = self.catalog.next_id();
        let name = source.name.to_string();
        log::debug!("registered shader `{name}` as {id:?}");

        let program = ShaderProgram {
            id,
            source,
            interface,
            module,
        };
        Ok(self.catalog.insert(&name, program))
    }

    pub fn id(&self, name: &str) -> Option<ShaderId> {
        self.catalog.id(name)
    }

    pub fn get(&self, id: ShaderId) -> Option<&ShaderProgram> {
        self.catalog.get(id)
    }

    /// Looks up a program by name.
    pub fn program(&self, name: &str) -> Result<&ShaderProgram, ShaderError> {
        self.id(name)
            .and_then(|id| self.get(id))
            .ok_or_else(|| ShaderError::Unknown(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.catalog.id(name).is_some()
    }

    /// Program names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.catalog.names.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShaderProgram> + '_ {
        self.catalog.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.catalog.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.entries.is_empty()
    }
}

fn compile(
    device: &wgpu::Device,
    source: &ShaderSource,
) -> Result<(wgpu::ShaderModule, ShaderInterface), ShaderError> {
    let interface = source.validate()?;

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(source.name.as_ref()),
        source: wgpu::ShaderSource::Wgsl(source.wgsl.clone()),
    });

    let info = pollster::block_on(module.get_compilation_info());
    let mut errors = Vec::new();

    for msg in &info.messages {
        let text = match msg.location {
            Some(loc) => format!("line {}: {}", loc.line_number, msg.message),
            None => msg.message.clone(),
        };
        match msg.message_type {
            wgpu::CompilationMessageType::Error => errors.push(text),
            wgpu::CompilationMessageType::Warning => {
                log::warn!("shader `{}`: {text}", source.name)
            }
            wgpu::CompilationMessageType::Info => {
                log::debug!("shader `{}`: {text}", source.name)
            }
        }
    }

    if !errors.is_empty() {
        return Err(ShaderError::Compile {
            name: source.name.to_string(),
            messages: errors,
        });
    }

    Ok((module, interface))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── catalog ───────────────────────────────────────────────────────────

    #[test]
    fn ids_follow_insertion_order() {
        let mut c = Catalog::<()>::default();
        for name in ["a", "b", "c"] {
            c.check_free(name).unwrap();
            c.insert(name, ());
        }
        assert_eq!(c.id("a"), Some(ShaderId(0)));
        assert_eq!(c.id("c"), Some(ShaderId(2)));
        assert_eq!(c.names, ["a", "b", "c"]);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut c = Catalog::<u8>::default();
        c.insert("lambert", 1);
        assert_eq!(
            c.check_free("lambert"),
            Err(ShaderError::Duplicate("lambert".into()))
        );
        assert_eq!(c.entries.len(), 1);
    }

    #[test]
    fn blank_name_is_rejected() {
        let c = Catalog::<u8>::default();
        assert_eq!(c.check_free(""), Err(ShaderError::EmptyName));
    }

    #[test]
    fn unknown_id_is_none() {
        let c = Catalog::<u8>::default();
        assert!(c.get(ShaderId(3)).is_none());
        assert!(c.id("missing").is_none());
    }

    // ── registry ──────────────────────────────────────────────────────────

    #[test]
    fn empty_registry_reports_unknown() {
        let r = ShaderRegistry::empty();
        assert!(r.is_empty());
        assert!(!r.contains("unlit"));
        assert!(matches!(r.program("unlit"), Err(ShaderError::Unknown(n)) if n == "unlit"));
    }

    // ── compiled on a device ──────────────────────────────────────────────

    #[test]
    fn builtins_get_dense_ids_in_list_order() {
        let Some(gpu) = crate::device::test_gpu() else { return };
        let r = ShaderRegistry::new(gpu.device()).unwrap();

        assert_eq!(r.len(), BUILTIN_SHADERS.len());
        for (i, source) in BUILTIN_SHADERS.iter().enumerate() {
            let program = r.program(&source.name).unwrap();
            assert_eq!(program.id(), ShaderId(i as u32));
            assert_eq!(r.get(ShaderId(i as u32)).map(|p| p.name()), Some(source.name.as_ref()));
        }
        assert!(r.get(ShaderId(BUILTIN_SHADERS.len() as u32)).is_none());
    }

    #[test]
    fn failed_registration_leaves_registry_unchanged() {
        let Some(gpu) = crate::device::test_gpu() else { return };
        let mut r = ShaderRegistry::new(gpu.device()).unwrap();
        let before: Vec<String> = r.names().map(str::to_string).collect();

        let broken = ShaderSource::new("broken", "fn vs_main( {");
        assert!(matches!(r.register(gpu.device(), broken), Err(ShaderError::Parse { .. })));

        let dup = BUILTIN_SHADERS[0].clone();
        assert!(matches!(r.register(gpu.device(), dup), Err(ShaderError::Duplicate(_))));

        assert_eq!(r.names().collect::<Vec<_>>(), before);
        assert!(!r.contains("broken"));
    }

    #[test]
    fn custom_program_follows_builtins() {
        let Some(gpu) = crate::device::test_gpu() else { return };
        let mut r = ShaderRegistry::new(gpu.device()).unwrap();

        let mut custom = BUILTIN_SHADERS[0].clone();
        custom.name = "custom".into();
        let id = r.register(gpu.device(), custom).unwrap();

        assert_eq!(id, ShaderId(BUILTIN_SHADERS.len() as u32));
        assert_eq!(r.iter().last().map(ShaderProgram::name), Some("custom"));
        assert_eq!(r.get(id).map(|p| p.interface().bindings.len()), Some(2));
    }
}
