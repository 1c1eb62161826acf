use cubecl::{prelude::*, server::Handle};
use std::marker::PhantomData;

use super::{
    B2bGroupArgs, B2bInstanceArgs, BroadcastArg, BufferArg, MatmulInvalidProblem,
    MatmulLaunchError, MatrixArg, SourceBinding,
};
use crate::components::{
    B2bConfig, B2bEpilogue, B2bIdent, B2bSelection, DeviceCapabilities, EpilogueOp,
    GroupedB2bProblem, MatmulElem, MatmulPrecision,
    batch::{GroupedScheduler, b2b_gemm},
    global::{EpilogueConfig, METADATA_STRIDE, OperandPlacement, SourceLocation, push_metadata},
};

/// Launches a fused matmul over a group of problems, returning the output buffer.
#[allow(clippy::result_large_err)]
pub fn launch<R: Runtime, MP: MatmulPrecision, E0: EpilogueOp, E1: EpilogueOp>(
    client: &ComputeClient<R::Server>,
    selection: &B2bSelection,
    epilogue: &B2bEpilogue<E0, E1>,
    args: B2bGroupArgs,
) -> Result<Handle, MatmulLaunchError> {
    launch_ref::<R, MP, E0, E1>(client, selection, epilogue, &args)?;

    Ok(args.out.handle)
}

/// Launches a fused matmul over a group of problems.
///
/// The configuration and every operand are validated before anything is launched. A group
/// without any output tile returns without launching.
#[allow(clippy::result_large_err)]
pub fn launch_ref<R: Runtime, MP: MatmulPrecision, E0: EpilogueOp, E1: EpilogueOp>(
    client: &ComputeClient<R::Server>,
    selection: &B2bSelection,
    epilogue: &B2bEpilogue<E0, E1>,
    args: &B2bGroupArgs,
) -> Result<(), MatmulLaunchError> {
    let device = DeviceCapabilities::from_client::<R>(client);
    let config = B2bConfig::setup::<MP>(selection, &device)?;

    let uses_bias0 = epilogue.op0.is_source_needed();
    let uses_source1 = epilogue.op1.is_source_needed();
    let epilogue_config = EpilogueConfig {
        activation0: epilogue.op0.activation(),
        bias0: uses_bias0,
        activation1: epilogue.op1.activation(),
        source1: match (uses_source1, &args.source1) {
            (false, _) => SourceLocation::Absent,
            (true, SourceBinding::Out) => SourceLocation::Out,
            (true, _) => SourceLocation::Buffer,
        },
    };
    let source1_len = match &args.source1 {
        SourceBinding::None => None,
        SourceBinding::Buffer(buffer) => Some(buffer.len),
        SourceBinding::Out => Some(args.out.len),
    };

    let num_problems = args.instances.len();
    let group_too_large = MatmulInvalidProblem::GroupTooLarge {
        problems: num_problems,
    };
    if (num_problems as u64) * (METADATA_STRIDE as u64) > u32::MAX as u64 {
        return Err(group_too_large.into());
    }

    let mut metadata = Vec::with_capacity(num_problems * METADATA_STRIDE as usize);
    for (index, instance) in args.instances.iter().enumerate() {
        let validator = InstanceValidator::<MP> {
            config: &config,
            index,
            args: instance,
            _precision: PhantomData,
        };
        validator.check_intermediate()?;
        let placements = [
            validator.matrix(B2bIdent::Lhs0, &instance.lhs0, args.lhs0.len)?,
            validator.matrix(B2bIdent::Rhs0, &instance.rhs0, args.rhs0.len)?,
            validator.matrix(B2bIdent::Rhs1, &instance.rhs1, args.rhs1.len)?,
            validator.epilogue_operand(
                B2bIdent::Bias0,
                uses_bias0,
                instance.bias0.as_ref(),
                args.bias0.as_ref().map(|buffer| buffer.len),
            )?,
            validator.epilogue_operand(
                B2bIdent::Source1,
                uses_source1,
                instance.source1.as_ref(),
                source1_len,
            )?,
            validator.matrix(B2bIdent::Out, &instance.out, args.out.len)?,
        ];
        push_metadata(&mut metadata, &instance.problem, &placements);
    }

    let problem = args
        .instances
        .iter()
        .map(|instance| instance.problem)
        .collect::<GroupedB2bProblem>();
    let scheduler = GroupedScheduler::new(
        &problem,
        config.tiling.tile_m(),
        config.tiling.tile_n(),
        config.global_order,
        config.cube_count_plan,
        device.num_streaming_multiprocessors,
    )
    .ok_or(group_too_large)?;

    if scheduler.total_tiles() == 0 {
        log::debug!("Fused matmul over {} empty problems skipped", problem.len());
        return Ok(());
    }

    let schedule_words = scheduler.schedule();
    let metadata = client.create(u32::as_bytes(&metadata));
    let schedule = client.create(u32::as_bytes(&schedule_words));
    let placeholder = BufferArg::new(client.create(MP::EO::as_bytes(&[MP::EO::narrow(0.0)])), 1);

    let bias0 = match uses_bias0 {
        true => args.bias0.as_ref().unwrap_or(&placeholder),
        false => &placeholder,
    };
    let source1 = match (uses_source1, &args.source1) {
        (true, SourceBinding::Buffer(buffer)) => buffer,
        _ => &placeholder,
    };

    let cube_dim = config.cube_dim();
    let cube_count = scheduler.cube_count();
    log::debug!(
        "Launching fused matmul over {} problems: {} tiles on {} cubes of {cube_dim:?}",
        problem.len(),
        scheduler.total_tiles(),
        scheduler.num_cubes(),
    );

    unsafe {
        b2b_gemm::launch_unchecked::<MP::EI, MP::ES, MP::EA, MP::EO, R>(
            client,
            cube_count,
            cube_dim,
            array_arg::<R, MP::EI>(&args.lhs0),
            array_arg::<R, MP::EI>(&args.rhs0),
            array_arg::<R, MP::EI>(&args.rhs1),
            array_arg::<R, MP::EO>(bias0),
            array_arg::<R, MP::EO>(source1),
            array_arg::<R, MP::EO>(&args.out),
            ArrayArg::from_raw_parts::<u32>(&metadata, problem.len() * METADATA_STRIDE as usize, 1),
            ArrayArg::from_raw_parts::<u32>(&schedule, schedule_words.len(), 1),
            ScalarArg::new(epilogue.op0.alpha()),
            ScalarArg::new(epilogue.op0.beta()),
            ScalarArg::new(epilogue.op0.mask_fill()),
            ScalarArg::new(epilogue.op1.alpha()),
            ScalarArg::new(epilogue.op1.beta()),
            ScalarArg::new(scheduler.total_tiles()),
            ScalarArg::new(scheduler.num_cubes()),
            config.kernel_config(epilogue_config),
        );
    }

    Ok(())
}

/// # Safety
///
/// `buffer.len` must not exceed the elements of type `E` held by the buffer.
unsafe fn array_arg<R: Runtime, E: CubeElement + CubePrimitive>(buffer: &BufferArg) -> ArrayArg<'_, R> {
    unsafe { ArrayArg::from_raw_parts::<E>(&buffer.handle, buffer.len, 1) }
}

struct InstanceValidator<'a, MP: MatmulPrecision> {
    config: &'a B2bConfig,
    index: usize,
    args: &'a B2bInstanceArgs,
    _precision: PhantomData<MP>,
}

impl<MP: MatmulPrecision> InstanceValidator<'_, MP> {
    fn check_intermediate(&self) -> Result<(), MatmulInvalidProblem> {
        let n0 = self.args.problem.n0;
        let max = self.config.tiling.max_intermediate_width();

        match n0 > max {
            true => Err(MatmulInvalidProblem::IntermediateTooWide {
                instance: self.index,
                n0,
                max,
            }),
            false => Ok(()),
        }
    }

    fn matrix(
        &self,
        ident: B2bIdent,
        arg: &MatrixArg,
        len: usize,
    ) -> Result<OperandPlacement, MatmulInvalidProblem> {
        let (rows, cols) = self.args.problem.shape(ident);
        let layout = self.config.layouts.get(ident);
        let extent = layout.contiguous_extent(rows, cols);
        let alignment = self.config.alignment.get(ident) as usize;

        let is_aligned = |value: usize| value % alignment == 0;
        if !is_aligned(arg.offset) || !is_aligned(arg.ld) || !is_aligned(extent as usize) {
            return Err(MatmulInvalidProblem::Misaligned {
                instance: self.index,
                ident,
                alignment: alignment as u32,
            });
        }

        if arg.ld < extent as usize {
            return Err(MatmulInvalidProblem::InvalidLeadingDimension {
                instance: self.index,
                ident,
                ld: arg.ld,
                extent,
            });
        }

        let (row_stride, col_stride) = layout.strides(arg.ld);
        self.placement(ident, arg.offset, row_stride, col_stride, len)
    }

    fn epilogue_operand(
        &self,
        ident: B2bIdent,
        is_needed: bool,
        arg: Option<&BroadcastArg>,
        len: Option<usize>,
    ) -> Result<OperandPlacement, MatmulInvalidProblem> {
        match (is_needed, arg, len) {
            (false, _, _) => Ok(OperandPlacement::default()),
            (true, Some(arg), Some(len)) => {
                self.placement(ident, arg.offset, arg.row_stride, arg.col_stride, len)
            }
            _ => Err(MatmulInvalidProblem::MissingOperand {
                instance: self.index,
                ident,
            }),
        }
    }

    /// Checks that every element of the operand is inside its buffer and indexable with
    /// 32 bits.
    fn placement(
        &self,
        ident: B2bIdent,
        offset: usize,
        row_stride: usize,
        col_stride: usize,
        len: usize,
    ) -> Result<OperandPlacement, MatmulInvalidProblem> {
        let overflow = MatmulInvalidProblem::IndexOverflow {
            instance: self.index,
            ident,
        };
        let (rows, cols) = self.args.problem.shape(ident);

        if rows > 0 && cols > 0 {
            let required = (rows as usize - 1)
                .checked_mul(row_stride)
                .zip((cols as usize - 1).checked_mul(col_stride))
                .and_then(|(rows, cols)| rows.checked_add(cols))
                .and_then(|last| last.checked_add(offset))
                .and_then(|last| last.checked_add(1))
                .ok_or(MatmulInvalidProblem::IndexOverflow {
                    instance: self.index,
                    ident,
                })?;

            if required > len {
                return Err(MatmulInvalidProblem::OperandOutOfBounds {
                    instance: self.index,
                    ident,
                    required,
                    len,
                });
            }

            if required - 1 > u32::MAX as usize {
                return Err(overflow);
            }
        }

        let narrow = |value: usize| u32::try_from(value).ok();
        match (narrow(offset), narrow(row_stride), narrow(col_stride)) {
            (Some(offset), Some(row_stride), Some(col_stride)) => {
                Ok(OperandPlacement::new(offset, row_stride, col_stride))
            }
            _ => Err(overflow),
        }
    }
}
