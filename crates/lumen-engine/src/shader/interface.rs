use naga::valid::ModuleInfo;

/// A resource binding used by a program's entry points.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShaderBinding {
    pub group: u32,
    pub binding: u32,
    /// Declared as `var<uniform>`.
    pub uniform: bool,
    /// Size of the bound type in bytes.
    pub size: u64,
}

/// What a validated program expects from the pipeline it is built into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderInterface {
    /// Bindings read by either entry point, ordered by group then binding.
    pub bindings: Vec<ShaderBinding>,
    /// `@location`s consumed by the vertex entry point, ascending.
    pub vertex_locations: Vec<u32>,
}

impl ShaderInterface {
    /// Collects the interface of the entry points at `vertex` and `fragment`.
    pub(super) fn reflect(
        module: &naga::Module,
        info: &ModuleInfo,
        vertex: usize,
        fragment: usize,
    ) -> Self {
        let mut bindings = Vec::new();
        for (handle, var) in module.global_variables.iter() {
            let Some(rb) = &var.binding else { continue };
            let used = [vertex, fragment]
                .iter()
                .any(|&ep| !info.get_entry_point(ep)[handle].is_empty());
            if !used {
                continue;
            }
            bindings.push(ShaderBinding {
                group: rb.group,
                binding: rb.binding,
                uniform: var.space == naga::AddressSpace::Uniform,
                size: module.types[var.ty].inner.size(module.to_ctx()) as u64,
            });
        }
        bindings.sort_by_key(|b| (b.group, b.binding));

        let mut vertex_locations = Vec::new();
        for arg in &module.entry_points[vertex].function.arguments {
            match &arg.binding {
                Some(binding) => push_location(&mut vertex_locations, binding),
                None => {
                    if let naga::TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
                        for binding in members.iter().filter_map(|m| m.binding.as_ref()) {
                            push_location(&mut vertex_locations, binding);
                        }
                    }
                }
            }
        }
        vertex_locations.sort_unstable();

        Self {
            bindings,
            vertex_locations,
        }
    }

    pub fn binding(&self, group: u32, binding: u32) -> Option<&ShaderBinding> {
        self.bindings
            .iter()
            .find(|b| b.group == group && b.binding == binding)
    }
}

fn push_location(out: &mut Vec<u32>, binding: &naga::Binding) {
    if let naga::Binding::Location { location, .. } = binding {
        out.push(*location);
    }
}
